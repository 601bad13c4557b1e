//! `glob`: find files by name pattern, newest first

use serde::Deserialize;
use skiff_core::ToolError;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::{Sandbox, ToolParams};

#[derive(Debug, Clone, Deserialize)]
pub struct GlobParams {
    /// Pattern relative to `path`, e.g. `**/*.rs`
    pub pattern: String,
    /// Directory to search; the sandbox root when absent
    #[serde(default)]
    pub path: Option<String>,
}

impl ToolParams for GlobParams {
    fn validate(&self) -> Result<(), ToolError> {
        if self.pattern.trim().is_empty() {
            return Err(ToolError::validation("pattern cannot be empty"));
        }
        Ok(())
    }
}

pub fn glob(sandbox: &Sandbox, params: &GlobParams) -> Result<String, ToolError> {
    let requested = params.path.as_deref().unwrap_or(".");
    let base = sandbox.resolve(requested)?;
    if !base.is_dir() {
        return Err(ToolError::NotFound(format!(
            "Directory not found: {}",
            requested
        )));
    }

    let full_pattern = format!(
        "{}/{}",
        ::glob::Pattern::escape(&base.to_string_lossy()),
        params.pattern.trim_start_matches("./")
    );
    let paths = ::glob::glob(&full_pattern)
        .map_err(|e| ToolError::validation(format!("invalid glob pattern: {}", e)))?;

    // Patterns may contain `..` or cross symlinks; only keep what stays inside
    let mut matches: Vec<(PathBuf, SystemTime)> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file() && sandbox.contains(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (path, modified)
        })
        .collect();

    if matches.is_empty() {
        return Ok(format!(
            "No files found matching pattern '{}' in {}",
            params.pattern, requested
        ));
    }

    matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(matches
        .iter()
        .map(|(path, _)| sandbox.relative_display(path))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn params(pattern: &str, path: Option<&str>) -> GlobParams {
        GlobParams {
            pattern: pattern.to_string(),
            path: path.map(str::to_string),
        }
    }

    fn touch(path: &std::path::Path, age: Duration) {
        fs::write(path, "").unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_glob_orders_newest_first() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        touch(&dir.path().join("src/old.rs"), Duration::from_secs(3600));
        touch(&dir.path().join("src/new.rs"), Duration::from_secs(0));
        touch(&dir.path().join("top.rs"), Duration::from_secs(60));
        fs::write(dir.path().join("notes.md"), "").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let found = glob(&sandbox, &params("**/*.rs", None)).unwrap();
        assert_eq!(found, "src/new.rs\ntop.rs\nsrc/old.rs");

        let found = glob(&sandbox, &params("*.rs", Some("src"))).unwrap();
        assert_eq!(found, "src/new.rs\nsrc/old.rs");
    }

    #[test]
    fn test_glob_no_match() {
        let dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        assert_eq!(
            glob(&sandbox, &params("*.go", None)).unwrap(),
            "No files found matching pattern '*.go' in ."
        );
    }

    #[test]
    fn test_glob_pattern_cannot_climb_out() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("code");
        fs::create_dir(&root).unwrap();
        fs::write(parent.path().join("secret.txt"), "").unwrap();
        let sandbox = Sandbox::new(&root).unwrap();

        let found = glob(&sandbox, &params("../*.txt", None)).unwrap();
        assert!(found.starts_with("No files found"));
        assert!(matches!(
            glob(&sandbox, &params("*", Some(".."))),
            Err(ToolError::Containment(_))
        ));
    }
}

//! `read`: return file contents, optionally a line range

use serde::Deserialize;
use skiff_core::ToolError;
use std::fs;
use std::path::Path;

use crate::{truncate_chars, Sandbox, ToolParams};

/// Hard cap on characters returned by one read
pub const MAX_READ_CHARS: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct ReadParams {
    /// File path relative to the sandbox root
    pub path: String,
    /// Lines to skip from the start (0-indexed)
    #[serde(default)]
    pub skip: usize,
    /// Lines to return; all remaining when absent
    #[serde(default)]
    pub lines: Option<usize>,
}

impl ToolParams for ReadParams {
    fn validate(&self) -> Result<(), ToolError> {
        if self.lines == Some(0) {
            return Err(ToolError::validation("lines must be at least 1"));
        }
        Ok(())
    }
}

pub fn read(sandbox: &Sandbox, params: &ReadParams) -> Result<String, ToolError> {
    let path = sandbox.resolve(&params.path)?;
    let bytes = fs::read(&path).map_err(|e| ToolError::from_io(e, Path::new(&params.path)))?;
    let content = String::from_utf8_lossy(&bytes);

    if params.skip == 0 && params.lines.is_none() {
        return Ok(truncate_chars(&content, MAX_READ_CHARS).to_string());
    }

    let all_lines: Vec<&str> = content.split_inclusive('\n').collect();
    if params.skip >= all_lines.len() {
        return Err(ToolError::validation(format!(
            "Skip value {} exceeds file length",
            params.skip
        )));
    }

    let end = match params.lines {
        Some(lines) => params.skip.saturating_add(lines).min(all_lines.len()),
        None => all_lines.len(),
    };
    let selected = all_lines[params.skip..end].concat();
    Ok(truncate_chars(&selected, MAX_READ_CHARS).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(content: &str) -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), content).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    fn params(skip: usize, lines: Option<usize>) -> ReadParams {
        ReadParams {
            path: "f.txt".to_string(),
            skip,
            lines,
        }
    }

    #[test]
    fn test_read_whole_file() {
        let (_dir, sandbox) = setup("a\nb\n");
        assert_eq!(read(&sandbox, &params(0, None)).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_read_is_capped() {
        let (_dir, sandbox) = setup(&"x".repeat(MAX_READ_CHARS + 500));
        let text = read(&sandbox, &params(0, None)).unwrap();
        assert_eq!(text.chars().count(), MAX_READ_CHARS);
    }

    #[test]
    fn test_read_line_range() {
        let (_dir, sandbox) = setup("one\ntwo\nthree\nfour\n");
        assert_eq!(read(&sandbox, &params(1, Some(2))).unwrap(), "two\nthree\n");
        assert_eq!(read(&sandbox, &params(3, None)).unwrap(), "four\n");
        assert_eq!(read(&sandbox, &params(2, Some(100))).unwrap(), "three\nfour\n");
    }

    #[test]
    fn test_read_skip_past_end() {
        let (_dir, sandbox) = setup("one\ntwo\n");
        let err = read(&sandbox, &params(2, None)).unwrap_err();
        assert!(err.to_string().contains("Skip value 2 exceeds file length"));
    }

    #[test]
    fn test_read_missing_file() {
        let (_dir, sandbox) = setup("");
        let err = read(
            &sandbox,
            &ReadParams {
                path: "nope.txt".into(),
                skip: 0,
                lines: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, ToolError::NotFound("File not found: nope.txt".into()));
    }

    #[test]
    fn test_zero_lines_rejected() {
        assert!(params(0, Some(0)).validate().is_err());
    }
}

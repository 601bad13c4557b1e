//! `edit`: exact-substring replacement in one file

use serde::Deserialize;
use skiff_core::ToolError;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::{audit, Sandbox, ToolParams};

#[derive(Debug, Clone, Deserialize)]
pub struct EditParams {
    pub path: String,
    pub search: String,
    pub replace: String,
    pub audit_log: String,
    /// Replace every occurrence instead of requiring a unique match
    #[serde(default)]
    pub global_replace: bool,
}

impl ToolParams for EditParams {
    fn validate(&self) -> Result<(), ToolError> {
        audit::validate_audit_log(&self.audit_log)
    }
}

/// Apply one search/replace to `content`.
///
/// Returns the new content and the number of replacements made. Fails when
/// the search is empty, a no-op, absent, or ambiguous without `global`.
pub(crate) fn apply_replacement(
    content: &str,
    search: &str,
    replace: &str,
    global: bool,
    path: &str,
) -> Result<(String, usize), ToolError> {
    if search.is_empty() {
        return Err(ToolError::validation("search text cannot be empty"));
    }
    if search == replace {
        return Err(ToolError::validation(
            "search and replace cannot be the same",
        ));
    }

    let occurrences = content.matches(search).count();
    if occurrences == 0 {
        return Err(ToolError::NotFound(format!(
            "search text not found in {}",
            path
        )));
    }
    if occurrences > 1 && !global {
        return Err(ToolError::Ambiguous(format!(
            "search text appears {} times in {}. Use global_replace=true to replace all occurrences",
            occurrences, path
        )));
    }

    if global {
        Ok((content.replace(search, replace), occurrences))
    } else {
        Ok((content.replacen(search, replace, 1), 1))
    }
}

pub(crate) fn read_for_edit(path: &Path, display: &str) -> Result<String, ToolError> {
    fs::read_to_string(path).map_err(|e| ToolError::from_io(e, Path::new(display)))
}

pub fn edit(sandbox: &Sandbox, params: &EditParams) -> Result<String, ToolError> {
    let path = sandbox.resolve(&params.path)?;
    let content = read_for_edit(&path, &params.path)?;

    let (updated, replaced) = apply_replacement(
        &content,
        &params.search,
        &params.replace,
        params.global_replace,
        &params.path,
    )?;
    sandbox.atomic_write(&path, &updated)?;

    info!("Edited {} ({} replacements)", path.display(), replaced);
    if params.global_replace {
        Ok(format!(
            "Edited {} ({} replacements)",
            params.path, replaced
        ))
    } else {
        Ok(format!("Edited {}", params.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(content: &str) -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lib.rs"), content).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    fn params(search: &str, replace: &str, global: bool) -> EditParams {
        EditParams {
            path: "lib.rs".to_string(),
            search: search.to_string(),
            replace: replace.to_string(),
            audit_log: "Rename helper".to_string(),
            global_replace: global,
        }
    }

    #[test]
    fn test_apply_replacement_rules() {
        assert_eq!(
            apply_replacement("a b a", "b", "c", false, "f").unwrap(),
            ("a c a".to_string(), 1)
        );
        assert_eq!(
            apply_replacement("a b a", "a", "x", true, "f").unwrap(),
            ("x b x".to_string(), 2)
        );
        assert!(matches!(
            apply_replacement("a b a", "a", "x", false, "f"),
            Err(ToolError::Ambiguous(_))
        ));
        assert!(matches!(
            apply_replacement("abc", "z", "y", false, "f"),
            Err(ToolError::NotFound(_))
        ));
        assert!(matches!(
            apply_replacement("abc", "a", "a", false, "f"),
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            apply_replacement("abc", "", "y", false, "f"),
            Err(ToolError::Validation(_))
        ));
    }

    #[test]
    fn test_edit_applies_once() {
        let (dir, sandbox) = setup("fn old() {}\n");
        let text = edit(&sandbox, &params("old", "new", false)).unwrap();
        assert_eq!(text, "Edited lib.rs");
        assert_eq!(
            fs::read_to_string(dir.path().join("lib.rs")).unwrap(),
            "fn new() {}\n"
        );

        let err = edit(&sandbox, &params("old", "new", false)).unwrap_err();
        assert!(err.to_string().contains("search text not found"));
    }

    #[test]
    fn test_edit_global_reports_count() {
        let (dir, sandbox) = setup("x x x");
        let text = edit(&sandbox, &params("x", "y", true)).unwrap();
        assert_eq!(text, "Edited lib.rs (3 replacements)");
        assert_eq!(fs::read_to_string(dir.path().join("lib.rs")).unwrap(), "y y y");
    }

    #[test]
    fn test_edit_missing_file() {
        let (_dir, sandbox) = setup("");
        let mut p = params("a", "b", false);
        p.path = "missing.rs".to_string();
        assert_eq!(
            edit(&sandbox, &p).unwrap_err(),
            ToolError::NotFound("File not found: missing.rs".to_string())
        );
    }
}

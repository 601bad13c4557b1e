//! `multiedit`: an ordered batch of replacements applied all-or-nothing
//!
//! Each edit is checked against the content produced by the edits before
//! it. The file is written once, atomically, only after every edit passed.

use serde::Deserialize;
use skiff_core::ToolError;
use tracing::info;

use crate::edit::{apply_replacement, read_for_edit};
use crate::{audit, Sandbox, ToolParams};

/// One search/replace pair within a batch
#[derive(Debug, Clone, Deserialize)]
pub struct EditOperation {
    #[serde(alias = "old_string")]
    pub search: String,
    #[serde(alias = "new_string")]
    pub replace: String,
    #[serde(default, alias = "replace_all")]
    pub global_replace: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiEditParams {
    pub path: String,
    pub edits: Vec<EditOperation>,
    pub audit_log: String,
}

impl ToolParams for MultiEditParams {
    fn validate(&self) -> Result<(), ToolError> {
        audit::validate_audit_log(&self.audit_log)?;
        if self.edits.is_empty() {
            return Err(ToolError::validation("edits must contain at least one edit"));
        }
        Ok(())
    }
}

/// Tag an error with the 1-based position of the edit that raised it
fn in_edit(index: usize, err: ToolError) -> ToolError {
    let tag = |message: String| format!("Edit {}: {}", index + 1, message);
    match err {
        ToolError::Validation(m) => ToolError::Validation(tag(m)),
        ToolError::NotFound(m) => ToolError::NotFound(tag(m)),
        ToolError::Ambiguous(m) => ToolError::Ambiguous(tag(m)),
        other => other,
    }
}

pub fn multiedit(sandbox: &Sandbox, params: &MultiEditParams) -> Result<String, ToolError> {
    let path = sandbox.resolve(&params.path)?;
    let mut content = read_for_edit(&path, &params.path)?;

    for (index, op) in params.edits.iter().enumerate() {
        let (updated, _) = apply_replacement(
            &content,
            &op.search,
            &op.replace,
            op.global_replace,
            &params.path,
        )
        .map_err(|e| in_edit(index, e))?;
        content = updated;
    }

    sandbox.atomic_write(&path, &content)?;

    info!("Applied {} edits to {}", params.edits.len(), path.display());
    Ok(format!(
        "Applied {} edits to {}",
        params.edits.len(),
        params.path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn op(search: &str, replace: &str) -> EditOperation {
        EditOperation {
            search: search.to_string(),
            replace: replace.to_string(),
            global_replace: false,
        }
    }

    fn params(edits: Vec<EditOperation>) -> MultiEditParams {
        MultiEditParams {
            path: "app.py".to_string(),
            edits,
            audit_log: "Refactor greeting".to_string(),
        }
    }

    #[test]
    fn test_edits_see_prior_edits() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "hello world").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        // Second edit only matches text introduced by the first
        let text = multiedit(
            &sandbox,
            &params(vec![op("hello", "goodbye"), op("goodbye world", "goodbye moon")]),
        )
        .unwrap();

        assert_eq!(text, "Applied 2 edits to app.py");
        assert_eq!(
            fs::read_to_string(dir.path().join("app.py")).unwrap(),
            "goodbye moon"
        );
    }

    #[test]
    fn test_failed_edit_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "a = 1\nb = 2\n").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let err = multiedit(&sandbox, &params(vec![op("a = 1", "a = 10"), op("c = 3", "c = 4")]))
            .unwrap_err();

        assert!(err.to_string().starts_with("Edit 2: "));
        assert_eq!(
            fs::read_to_string(dir.path().join("app.py")).unwrap(),
            "a = 1\nb = 2\n"
        );
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(params(vec![]).validate().is_err());
    }

    #[test]
    fn test_accepts_alternate_field_names() {
        let parsed = MultiEditParams::from_arguments(json!({
            "path": "app.py",
            "audit_log": "Swap names",
            "edits": [{"old_string": "a", "new_string": "b", "replace_all": true}]
        }))
        .unwrap();
        assert_eq!(parsed.edits[0].search, "a");
        assert!(parsed.edits[0].global_replace);
    }
}

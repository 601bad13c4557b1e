//! `ls`: recursive file listing

use serde::Deserialize;
use skiff_core::ToolError;

use crate::{audit, Sandbox, ToolParams};

#[derive(Debug, Clone, Deserialize)]
pub struct LsParams {
    #[serde(default = "default_directory")]
    pub directory: String,
    #[serde(default)]
    pub audit_log: Option<String>,
}

fn default_directory() -> String {
    "./".to_string()
}

impl ToolParams for LsParams {
    fn validate(&self) -> Result<(), ToolError> {
        audit::validate_optional_audit_log(self.audit_log.as_deref())
    }
}

pub fn ls(sandbox: &Sandbox, params: &LsParams) -> Result<String, ToolError> {
    let directory = sandbox.resolve(&params.directory)?;
    if !directory.is_dir() {
        return Err(ToolError::NotFound(format!(
            "Directory not found: {}",
            params.directory
        )));
    }

    let files: Vec<String> = sandbox
        .walk_files(&directory)
        .iter()
        .map(|path| sandbox.relative_display(path))
        .collect();

    if files.is_empty() {
        return Ok(format!("No files found in {}", params.directory));
    }
    Ok(files.join("\n"))
}

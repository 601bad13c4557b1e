//! `write`: create a file, refusing to overwrite unless forced

use serde::Deserialize;
use skiff_core::ToolError;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use tracing::info;

use crate::{audit, Sandbox, ToolParams};

#[derive(Debug, Clone, Deserialize)]
pub struct WriteParams {
    /// File name, relative to `directory`
    pub path: String,
    pub content: String,
    pub audit_log: String,
    /// Directory the file goes in; created when missing
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Overwrite an existing file
    #[serde(default)]
    pub force: bool,
}

fn default_directory() -> String {
    "./".to_string()
}

impl ToolParams for WriteParams {
    fn validate(&self) -> Result<(), ToolError> {
        audit::validate_audit_log(&self.audit_log)?;
        if self.path.trim().is_empty() {
            return Err(ToolError::validation("path cannot be empty"));
        }
        Ok(())
    }
}

pub fn write(sandbox: &Sandbox, params: &WriteParams) -> Result<String, ToolError> {
    // Both checks happen before anything is created
    let directory = sandbox.resolve(&params.directory)?;
    let requested = Path::new(&params.directory).join(&params.path);
    let target = sandbox.resolve(&requested.to_string_lossy())?;

    if target == sandbox.root() || target.is_dir() {
        return Err(ToolError::validation(format!(
            "{} is a directory",
            params.path
        )));
    }

    fs::create_dir_all(&directory).map_err(|e| ToolError::from_io(e, &directory))?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolError::from_io(e, parent))?;
    }

    let display = Path::new(&params.path);
    if params.force {
        fs::write(&target, &params.content).map_err(|e| ToolError::from_io(e, display))?;
    } else {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| ToolError::from_io(e, display))?;
        file.write_all(params.content.as_bytes())
            .map_err(|e| ToolError::from_io(e, display))?;
    }

    info!("Wrote {} ({} bytes)", target.display(), params.content.len());
    Ok(format!("Written to {}", params.path))
}

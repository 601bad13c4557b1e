//! System instructions

use skiff_core::Result;
use std::path::Path;

/// Used when no system prompt file is configured or present
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a coding assistant working inside a sandboxed project directory.
Use the tools to inspect and change files: read before you edit, prefer edit and multiedit \
for targeted changes, and use write only for new files.
Every path is relative to the project directory; paths outside it are rejected.
Give every write, edit and multiedit call a short audit_log describing the change, \
like a commit title.
Track multi-step work with the todo tool.
When the task is done, reply with a brief summary of what changed.";

/// Read the system prompt from `path`, falling back to the built-in prompt
/// when the file is not configured or does not exist
pub fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)?;
            tracing::debug!("Loaded system prompt from {}", path.display());
            Ok(content.trim().to_string())
        }
        Some(path) => {
            tracing::debug!(
                "System prompt file {} not found, using built-in prompt",
                path.display()
            );
            Ok(DEFAULT_SYSTEM_PROMPT.to_string())
        }
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
    }
}

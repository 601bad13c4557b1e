//! Unified error types for skiff

use std::io;
use std::path::Path;
use thiserror::Error;

/// Unified error type for skiff operations outside a single tool call
#[derive(Error, Debug)]
pub enum SkiffError {
    #[error("Configuration error: {0}")]
    Config(String),

    // Inference backend errors
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using SkiffError
pub type Result<T> = std::result::Result<T, SkiffError>;

/// Errors raised by a single tool invocation.
///
/// These never leave the dispatcher: every variant is converted into a
/// failure result that goes back to the model as ordinary content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Path \"{0}\" is outside the permitted working directory")]
    Containment(String),

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("File {0} already exists")]
    AlreadyExists(String),

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Command failed with {status}:\n{output}")]
    CommandFailed { status: String, output: String },

    #[error("{0}")]
    Ambiguous(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Io(String),
}

impl ToolError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(format!("File not found: {}", path.display())),
            io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("Permission denied: {}", path.display()))
            }
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.display().to_string()),
            _ => Self::Io(format!("{}: {}", path.display(), err)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_kinds() {
        let path = Path::new("missing.txt");

        let err = ToolError::from_io(io::Error::from(io::ErrorKind::NotFound), path);
        assert_eq!(err, ToolError::NotFound("File not found: missing.txt".to_string()));

        let err = ToolError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), path);
        assert_eq!(
            err,
            ToolError::PermissionDenied("Permission denied: missing.txt".to_string())
        );

        let err = ToolError::from_io(io::Error::from(io::ErrorKind::AlreadyExists), path);
        assert_eq!(err.to_string(), "File missing.txt already exists");

        let err = ToolError::from_io(io::Error::other("disk on fire"), path);
        assert!(matches!(err, ToolError::Io(msg) if msg.contains("disk on fire")));
    }

    #[test]
    fn test_tool_error_messages() {
        assert_eq!(
            ToolError::Timeout(1).to_string(),
            "Command timed out after 1 seconds"
        );
        assert_eq!(
            ToolError::UnknownTool("frobnicate".into()).to_string(),
            "Unknown tool: frobnicate"
        );
        assert!(ToolError::Containment("../x".into())
            .to_string()
            .contains("outside the permitted working directory"));
    }
}

//! Audit log validation
//!
//! Mutating tools carry a short imperative summary of what they do, shown to
//! the user alongside each call.

use serde_json::Value;
use skiff_core::ToolError;

use crate::dispatcher::decode_arguments;

/// Upper bound on words in an audit log entry
pub const MAX_AUDIT_LOG_WORDS: usize = 10;

/// Reject empty or overlong audit logs
pub fn validate_audit_log(audit_log: &str) -> Result<(), ToolError> {
    let words = audit_log.split_whitespace().count();
    if words == 0 {
        return Err(ToolError::validation("audit_log cannot be empty"));
    }
    if words > MAX_AUDIT_LOG_WORDS {
        return Err(ToolError::validation(format!(
            "audit_log must be at most {} words, got {}",
            MAX_AUDIT_LOG_WORDS, words
        )));
    }
    Ok(())
}

/// Same as [`validate_audit_log`] for tools where the log is optional
pub fn validate_optional_audit_log(audit_log: Option<&str>) -> Result<(), ToolError> {
    match audit_log {
        Some(log) => validate_audit_log(log),
        None => Ok(()),
    }
}

/// Pull the audit log out of raw call arguments, for display
pub fn audit_log_of(arguments: &Value) -> Option<String> {
    decode_arguments(arguments)
        .get("audit_log")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|log| !log.is_empty())
        .map(str::to_string)
}

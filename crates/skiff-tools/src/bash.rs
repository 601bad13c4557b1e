//! `bash`: run a shell command inside the sandbox root

use serde::Deserialize;
use skiff_core::ToolError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{audit, truncate_chars, Sandbox, ToolParams};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const MAX_TIMEOUT_SECS: u64 = 600;
/// Captured output beyond this many characters is cut
pub const MAX_OUTPUT_CHARS: usize = 30_000;

#[derive(Debug, Clone, Deserialize)]
pub struct BashParams {
    pub command: String,
    #[serde(default)]
    pub audit_log: Option<String>,
    /// Seconds before the command is killed
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Return immediately with the PID instead of waiting
    #[serde(default)]
    pub run_in_background: bool,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ToolParams for BashParams {
    fn validate(&self) -> Result<(), ToolError> {
        audit::validate_optional_audit_log(self.audit_log.as_deref())?;
        if self.command.trim().is_empty() {
            return Err(ToolError::validation("command cannot be empty"));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout) {
            return Err(ToolError::validation(format!(
                "timeout must be between 1 and {} seconds, got {}",
                MAX_TIMEOUT_SECS, self.timeout
            )));
        }
        Ok(())
    }
}

fn shell(sandbox: &Sandbox, command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(sandbox.root())
        .stdin(Stdio::null());
    cmd
}

pub async fn run(sandbox: &Sandbox, params: &BashParams) -> Result<String, ToolError> {
    if params.run_in_background {
        return spawn_background(sandbox, &params.command);
    }

    debug!("Running `{}` (timeout {}s)", params.command, params.timeout);
    let child = shell(sandbox, &params.command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ToolError::Io(format!("Failed to start shell: {}", e)))?;

    // Dropping the wait future on timeout drops the child, which kills it
    let output = tokio::time::timeout(
        Duration::from_secs(params.timeout),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| ToolError::Timeout(params.timeout))?
    .map_err(|e| ToolError::Io(format!("Failed to collect command output: {}", e)))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let combined = cap_output(&combined);

    if output.status.success() {
        return Ok(combined);
    }

    let status = match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => format!("status {}", output.status),
    };
    Err(ToolError::CommandFailed {
        status,
        output: combined,
    })
}

fn spawn_background(sandbox: &Sandbox, command: &str) -> Result<String, ToolError> {
    let child = shell(sandbox, command)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ToolError::Io(format!("Failed to start shell: {}", e)))?;

    let pid = child
        .id()
        .ok_or_else(|| ToolError::Io("Background process exited before reporting a PID".into()))?;
    info!("Started background command `{}` as PID {}", command, pid);
    Ok(format!("Command started in background with PID: {}", pid))
}

fn cap_output(output: &str) -> String {
    let kept = truncate_chars(output, MAX_OUTPUT_CHARS);
    if kept.len() == output.len() {
        output.to_string()
    } else {
        format!(
            "{}\n... (output truncated to {} characters)",
            kept, MAX_OUTPUT_CHARS
        )
    }
}

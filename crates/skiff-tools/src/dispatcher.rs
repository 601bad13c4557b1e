//! Tool dispatcher
//!
//! Turns a tool name plus raw arguments into a [`ToolResultPart`]. Nothing a
//! tool does, including panicking, escapes as an error: every failure comes
//! back as an error result the model can read.

use futures::FutureExt;
use serde_json::{Map, Value};
use skiff_core::{ToolDefinition, ToolError, ToolResultPart};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::{bash, tool_catalog, Sandbox, ToolKind, ToolOutcome, ToolRequest};

/// Normalize raw tool arguments into a JSON object.
///
/// Objects pass through. Strings are decoded as JSON; anything that does not
/// decode to an object becomes `{}` so the tool's own required-field checks
/// produce the error message.
pub fn decode_arguments(raw: &Value) -> Value {
    match raw {
        Value::Object(_) => raw.clone(),
        Value::String(serialized) => match serde_json::from_str::<Value>(serialized) {
            Ok(decoded @ Value::Object(_)) => decoded,
            Ok(_) | Err(_) => {
                debug!("Tool arguments did not decode to an object, using empty arguments");
                Value::Object(Map::new())
            }
        },
        _ => Value::Object(Map::new()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Executes tool calls against one sandbox
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sandbox: Sandbox,
}

impl Dispatcher {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Tool definitions to advertise alongside this dispatcher
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        tool_catalog()
    }

    /// Run one tool call and package the outcome for the transcript
    pub async fn dispatch(
        &self,
        tool_name: &str,
        arguments: &Value,
        call_id: &str,
    ) -> ToolResultPart {
        debug!("Dispatching tool {} (call {})", tool_name, call_id);

        let outcome = match AssertUnwindSafe(self.execute(tool_name, arguments))
            .catch_unwind()
            .await
        {
            Ok(result) => ToolOutcome::from(result),
            Err(payload) => ToolOutcome::Failure {
                message: format!("Tool {} panicked: {}", tool_name, panic_message(&*payload)),
            },
        };

        if let ToolOutcome::Failure { message } = &outcome {
            warn!("Tool {} (call {}) failed: {}", tool_name, call_id, message);
        }

        outcome.into_result_part(tool_name, call_id)
    }

    /// Resolve, validate and run a tool call
    pub async fn execute(&self, tool_name: &str, arguments: &Value) -> Result<String, ToolError> {
        let kind: ToolKind = tool_name.parse()?;
        let request = ToolRequest::parse(kind, decode_arguments(arguments))?;

        match request {
            ToolRequest::Bash(params) => bash::run(&self.sandbox, &params).await,
            ToolRequest::File(request) => {
                let sandbox = self.sandbox.clone();
                tokio::task::spawn_blocking(move || request.execute(&sandbox))
                    .await
                    .map_err(|e| {
                        if e.is_panic() {
                            ToolError::Io(format!(
                                "Tool {} panicked: {}",
                                tool_name,
                                panic_message(&*e.into_panic())
                            ))
                        } else {
                            ToolError::Io(format!("Tool {} was cancelled", tool_name))
                        }
                    })?
            }
        }
    }
}

//! # skiff-tools
//!
//! The sandboxed tool surface the agent exposes to the model.
//!
//! - [`Sandbox`]: path containment and atomic file replacement
//! - one module per tool (`read`, `write`, `edit`, `multiedit`, `ls`, `glob`,
//!   `grep`, `bash`, `todo`), each with a typed parameter struct validated once
//!   at the boundary
//! - [`Dispatcher`]: maps a tool name plus raw arguments to a
//!   [`ToolResultPart`], converting every failure (including panics) into an
//!   error result
//! - [`tool_catalog`]: the static name/description/schema list sent to the model

pub mod audit;
pub mod bash;
mod catalog;
mod dispatcher;
pub mod edit;
pub mod glob;
pub mod grep;
pub mod ls;
pub mod multiedit;
pub mod read;
pub mod sandbox;
pub mod todo;
pub mod write;

use serde::de::DeserializeOwned;
use serde_json::Value;
use skiff_core::{ToolError, ToolResultPart};
use std::fmt;
use std::str::FromStr;

pub use catalog::tool_catalog;
pub use dispatcher::{decode_arguments, Dispatcher};
pub use sandbox::Sandbox;

/// The closed set of tools the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Read,
    Write,
    Edit,
    MultiEdit,
    Ls,
    Glob,
    Grep,
    Bash,
    Todo,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Read,
        ToolKind::Write,
        ToolKind::Edit,
        ToolKind::MultiEdit,
        ToolKind::Ls,
        ToolKind::Glob,
        ToolKind::Grep,
        ToolKind::Bash,
        ToolKind::Todo,
    ];

    /// Wire name used in tool calls
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Read => "read",
            ToolKind::Write => "write",
            ToolKind::Edit => "edit",
            ToolKind::MultiEdit => "multiedit",
            ToolKind::Ls => "ls",
            ToolKind::Glob => "glob",
            ToolKind::Grep => "grep",
            ToolKind::Bash => "bash",
            ToolKind::Todo => "todo",
        }
    }

    /// Tools that modify files and therefore require an audit log
    pub fn requires_audit_log(&self) -> bool {
        matches!(self, ToolKind::Write | ToolKind::Edit | ToolKind::MultiEdit)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Result of one tool invocation as seen by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success { text: String },
    Failure { message: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Text sent back to the model
    pub fn content(&self) -> String {
        match self {
            ToolOutcome::Success { text } => text.clone(),
            ToolOutcome::Failure { message } => format!("Error: {}", message),
        }
    }

    pub fn into_result_part(
        self,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
    ) -> ToolResultPart {
        ToolResultPart {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            content: self.content(),
            is_error: !self.is_success(),
        }
    }
}

impl From<Result<String, ToolError>> for ToolOutcome {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => ToolOutcome::Success { text },
            Err(err) => ToolOutcome::Failure {
                message: err.to_string(),
            },
        }
    }
}

/// Typed tool parameters, deserialized from the raw argument object
pub trait ToolParams: DeserializeOwned {
    /// Checks serde cannot express; runs before any I/O
    fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }

    fn from_arguments(arguments: Value) -> Result<Self, ToolError> {
        let params: Self =
            serde_json::from_value(arguments).map_err(|e| ToolError::validation(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

/// A fully validated tool invocation
#[derive(Debug, Clone)]
pub enum ToolRequest {
    /// Shell commands run on the async runtime
    Bash(bash::BashParams),
    /// Everything else is blocking filesystem work
    File(FsRequest),
}

/// Filesystem tool invocations
#[derive(Debug, Clone)]
pub enum FsRequest {
    Read(read::ReadParams),
    Write(write::WriteParams),
    Edit(edit::EditParams),
    MultiEdit(multiedit::MultiEditParams),
    Ls(ls::LsParams),
    Glob(glob::GlobParams),
    Grep(grep::GrepParams),
    Todo(todo::TodoParams),
}

impl ToolRequest {
    /// Deserialize and validate arguments for `kind`
    pub fn parse(kind: ToolKind, arguments: Value) -> Result<Self, ToolError> {
        let request = match kind {
            ToolKind::Bash => ToolRequest::Bash(bash::BashParams::from_arguments(arguments)?),
            ToolKind::Read => FsRequest::Read(read::ReadParams::from_arguments(arguments)?).into(),
            ToolKind::Write => {
                FsRequest::Write(write::WriteParams::from_arguments(arguments)?).into()
            }
            ToolKind::Edit => FsRequest::Edit(edit::EditParams::from_arguments(arguments)?).into(),
            ToolKind::MultiEdit => {
                FsRequest::MultiEdit(multiedit::MultiEditParams::from_arguments(arguments)?).into()
            }
            ToolKind::Ls => FsRequest::Ls(ls::LsParams::from_arguments(arguments)?).into(),
            ToolKind::Glob => FsRequest::Glob(glob::GlobParams::from_arguments(arguments)?).into(),
            ToolKind::Grep => FsRequest::Grep(grep::GrepParams::from_arguments(arguments)?).into(),
            ToolKind::Todo => FsRequest::Todo(todo::TodoParams::from_arguments(arguments)?).into(),
        };
        Ok(request)
    }
}

impl From<FsRequest> for ToolRequest {
    fn from(request: FsRequest) -> Self {
        ToolRequest::File(request)
    }
}

impl FsRequest {
    /// Run the tool against the sandbox. Blocks on filesystem I/O.
    pub fn execute(&self, sandbox: &Sandbox) -> Result<String, ToolError> {
        match self {
            FsRequest::Read(params) => read::read(sandbox, params),
            FsRequest::Write(params) => write::write(sandbox, params),
            FsRequest::Edit(params) => edit::edit(sandbox, params),
            FsRequest::MultiEdit(params) => multiedit::multiedit(sandbox, params),
            FsRequest::Ls(params) => ls::ls(sandbox, params),
            FsRequest::Glob(params) => glob::glob(sandbox, params),
            FsRequest::Grep(params) => grep::grep(sandbox, params),
            FsRequest::Todo(params) => todo::todo(sandbox, params),
        }
    }
}

/// Cut `text` to at most `max_chars` characters, on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

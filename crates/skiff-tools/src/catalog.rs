//! Tool definitions advertised to the model

use serde_json::{json, Value};
use skiff_core::ToolDefinition;

use crate::audit::MAX_AUDIT_LOG_WORDS;
use crate::bash::{DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS};
use crate::read::MAX_READ_CHARS;
use crate::ToolKind;

fn audit_log_property() -> Value {
    json!({
        "type": "string",
        "description": format!(
            "Short imperative summary of the action, at most {} words, like a commit title (e.g. 'Add config loader')",
            MAX_AUDIT_LOG_WORDS
        )
    })
}

fn description(kind: ToolKind) -> String {
    match kind {
        ToolKind::Read => format!(
            "Read a file in the working directory. Returns at most {} characters. \
             Use skip (0-based line offset) and lines to read a slice of a large file.",
            MAX_READ_CHARS
        ),
        ToolKind::Write => "Create a file. Fails if the file already exists unless force is true. \
             The directory is created when missing."
            .to_string(),
        ToolKind::Edit => "Replace an exact substring in a file. The search text must occur exactly once \
             unless global_replace is true. Read the file first so the search text matches exactly."
            .to_string(),
        ToolKind::MultiEdit => "Apply several search/replace edits to one file in order. Each edit sees the \
             result of the previous ones. If any edit fails, none are applied."
            .to_string(),
        ToolKind::Ls => "List every file under a directory, recursively. Paths are relative to the \
             working directory."
            .to_string(),
        ToolKind::Glob => "Find files by glob pattern such as '**/*.rs' or 'src/*.ts'. \
             Results are sorted by modification time, newest first."
            .to_string(),
        ToolKind::Grep => "Search file contents with a regular expression. Modes: 'files_with_matches' \
             (default) lists matching files, 'content' shows matching lines, 'count' shows matches per file."
            .to_string(),
        ToolKind::Bash => format!(
            "Run a shell command in the working directory. Default timeout {}s, max {}s. \
             Set run_in_background for long-running processes; only the PID is returned. \
             Prefer the dedicated file tools over cat, find and grep.",
            DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS
        ),
        ToolKind::Todo => "Track progress on multi-step work with a task list. Actions: list, add, \
             done, remove. Tasks are numbered from 1."
            .to_string(),
    }
}

fn input_schema(kind: ToolKind) -> Value {
    match kind {
        ToolKind::Read => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path relative to the working directory"},
                "skip": {"type": "integer", "minimum": 0, "default": 0, "description": "Lines to skip from the start"},
                "lines": {"type": "integer", "minimum": 1, "description": "Number of lines to read"}
            },
            "required": ["path"]
        }),
        ToolKind::Write => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Name of the file to create"},
                "content": {"type": "string", "description": "Full file contents"},
                "audit_log": audit_log_property(),
                "directory": {"type": "string", "default": "./", "description": "Directory for the file"},
                "force": {"type": "boolean", "default": false, "description": "Overwrite an existing file"}
            },
            "required": ["path", "content", "audit_log"]
        }),
        ToolKind::Edit => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File to modify"},
                "search": {"type": "string", "description": "Exact text to find"},
                "replace": {"type": "string", "description": "Replacement text"},
                "audit_log": audit_log_property(),
                "global_replace": {"type": "boolean", "default": false, "description": "Replace every occurrence"}
            },
            "required": ["path", "search", "replace", "audit_log"]
        }),
        ToolKind::MultiEdit => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File to modify"},
                "edits": {
                    "type": "array",
                    "minItems": 1,
                    "description": "Edits applied in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "search": {"type": "string"},
                            "replace": {"type": "string"},
                            "global_replace": {"type": "boolean", "default": false}
                        },
                        "required": ["search", "replace"]
                    }
                },
                "audit_log": audit_log_property()
            },
            "required": ["path", "edits", "audit_log"]
        }),
        ToolKind::Ls => json!({
            "type": "object",
            "properties": {
                "directory": {"type": "string", "default": "./", "description": "Directory to list"},
                "audit_log": audit_log_property()
            }
        }),
        ToolKind::Glob => json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Glob pattern, e.g. '**/*.py'"},
                "path": {"type": "string", "description": "Directory to search; defaults to the working directory"}
            },
            "required": ["pattern"]
        }),
        ToolKind::Grep => json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Regular expression"},
                "path": {"type": "string", "description": "File or directory to search"},
                "include": {"type": "string", "description": "Glob filter on file names, e.g. '*.{ts,tsx}'"},
                "file_type": {"type": "string", "description": "File type such as py, js, ts, rust, go"},
                "ignore_case": {"type": "boolean", "default": false},
                "mode": {
                    "type": "string",
                    "enum": ["content", "files_with_matches", "count"],
                    "default": "files_with_matches"
                },
                "before": {"type": "integer", "minimum": 0, "default": 0, "description": "Lines before each match (content mode)"},
                "after": {"type": "integer", "minimum": 0, "default": 0, "description": "Lines after each match (content mode)"},
                "context": {"type": "integer", "minimum": 0, "default": 0, "description": "Lines before and after each match (content mode)"},
                "line_number": {"type": "boolean", "default": false, "description": "Prefix lines with numbers (content mode)"},
                "count": {"type": "integer", "minimum": 1, "description": "Limit output to the first N entries"},
                "multiline": {"type": "boolean", "default": false, "description": "Let the pattern span lines"}
            },
            "required": ["pattern"]
        }),
        ToolKind::Bash => json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Shell command to run"},
                "audit_log": audit_log_property(),
                "timeout": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_TIMEOUT_SECS,
                    "default": DEFAULT_TIMEOUT_SECS
                },
                "run_in_background": {"type": "boolean", "default": false}
            },
            "required": ["command"]
        }),
        ToolKind::Todo => json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["list", "add", "done", "remove"]},
                "task": {"type": "string", "description": "Task text (add)"},
                "index": {"type": "integer", "minimum": 1, "description": "Task number (done, remove)"}
            },
            "required": ["action"]
        }),
    }
}

/// Every tool, in a stable order
pub fn tool_catalog() -> Vec<ToolDefinition> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| ToolDefinition {
            name: kind.name().to_string(),
            description: description(kind),
            input_schema: input_schema(kind),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_tool() {
        let catalog = tool_catalog();
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["read", "write", "edit", "multiedit", "ls", "glob", "grep", "bash", "todo"]
        );
        for tool in &catalog {
            assert_eq!(tool.input_schema["type"], "object");
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn test_mutating_tools_require_audit_log() {
        for tool in tool_catalog() {
            let kind: ToolKind = tool.name.parse().unwrap();
            let required = tool.input_schema["required"]
                .as_array()
                .map(|r| r.iter().any(|v| v == "audit_log"))
                .unwrap_or(false);
            assert_eq!(required, kind.requires_audit_log(), "{}", tool.name);
        }
    }
}

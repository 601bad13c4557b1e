//! `todo`: a small task list kept in `todos.json` at the sandbox root

use serde::{Deserialize, Serialize};
use skiff_core::ToolError;
use std::fs;
use std::path::Path;

use crate::{Sandbox, ToolParams};

/// File the list is persisted to, relative to the sandbox root
pub const TODO_FILE: &str = "todos.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub task: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoAction {
    List,
    Add,
    Done,
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TodoParams {
    pub action: TodoAction,
    /// Required for `add`
    #[serde(default)]
    pub task: Option<String>,
    /// 1-based position, required for `done` and `remove`
    #[serde(default)]
    pub index: Option<usize>,
}

impl ToolParams for TodoParams {
    fn validate(&self) -> Result<(), ToolError> {
        match self.action {
            TodoAction::Add if self.task.as_deref().map_or(true, |t| t.trim().is_empty()) => {
                Err(ToolError::validation("task is required for add"))
            }
            TodoAction::Done | TodoAction::Remove if self.index.is_none() => Err(
                ToolError::validation("index is required for done and remove"),
            ),
            _ => Ok(()),
        }
    }
}

fn load(path: &Path) -> Result<Option<Vec<TodoItem>>, ToolError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| ToolError::from_io(e, Path::new(TODO_FILE)))?;
    let items = serde_json::from_str(&content)
        .map_err(|e| ToolError::Io(format!("Failed to parse {}: {}", TODO_FILE, e)))?;
    Ok(Some(items))
}

fn save(sandbox: &Sandbox, path: &Path, items: &[TodoItem]) -> Result<(), ToolError> {
    let content = serde_json::to_string_pretty(items)
        .map_err(|e| ToolError::Io(format!("Failed to serialize todos: {}", e)))?;
    sandbox.atomic_write(path, &content)
}

/// Convert a 1-based index into a position in `items`
fn position(items: &[TodoItem], index: usize) -> Result<usize, ToolError> {
    if index == 0 || index > items.len() {
        return Err(ToolError::NotFound(format!("Invalid todo number: {}", index)));
    }
    Ok(index - 1)
}

fn render(items: &[TodoItem]) -> String {
    let mut out = String::from("Todos:");
    for (i, item) in items.iter().enumerate() {
        let mark = if item.done { '✓' } else { '○' };
        out.push_str(&format!("\n{}. {} {}", i + 1, mark, item.task));
    }
    out
}

pub fn todo(sandbox: &Sandbox, params: &TodoParams) -> Result<String, ToolError> {
    let path = sandbox.resolve(TODO_FILE)?;
    let loaded = load(&path)?;

    match params.action {
        TodoAction::List => match loaded {
            Some(items) if !items.is_empty() => Ok(render(&items)),
            _ => Ok("No todos found".to_string()),
        },
        TodoAction::Add => {
            let task = params.task.clone().unwrap_or_default();
            let mut items = loaded.unwrap_or_default();
            items.push(TodoItem {
                task: task.clone(),
                done: false,
            });
            save(sandbox, &path, &items)?;
            Ok(format!("Added: {}", task))
        }
        TodoAction::Done | TodoAction::Remove => {
            let Some(mut items) = loaded else {
                return Ok("No todos found".to_string());
            };
            let pos = position(&items, params.index.unwrap_or(0))?;

            let message = if params.action == TodoAction::Done {
                items[pos].done = true;
                format!("Marked done: {}", items[pos].task)
            } else {
                let removed = items.remove(pos);
                format!("Removed: {}", removed.task)
            };
            save(sandbox, &path, &items)?;
            Ok(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn call(sandbox: &Sandbox, action: TodoAction, task: Option<&str>, index: Option<usize>) -> Result<String, ToolError> {
        todo(
            sandbox,
            &TodoParams {
                action,
                task: task.map(str::to_string),
                index,
            },
        )
    }

    #[test]
    fn test_todo_lifecycle() {
        let dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        assert_eq!(call(&sandbox, TodoAction::List, None, None).unwrap(), "No todos found");
        assert_eq!(
            call(&sandbox, TodoAction::Add, Some("write tests"), None).unwrap(),
            "Added: write tests"
        );
        call(&sandbox, TodoAction::Add, Some("ship it"), None).unwrap();
        assert_eq!(
            call(&sandbox, TodoAction::Done, None, Some(1)).unwrap(),
            "Marked done: write tests"
        );
        assert_eq!(
            call(&sandbox, TodoAction::List, None, None).unwrap(),
            "Todos:\n1. ✓ write tests\n2. ○ ship it"
        );
        assert_eq!(
            call(&sandbox, TodoAction::Remove, None, Some(2)).unwrap(),
            "Removed: ship it"
        );

        let stored: Vec<TodoItem> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(TODO_FILE)).unwrap()).unwrap();
        assert_eq!(
            stored,
            vec![TodoItem {
                task: "write tests".into(),
                done: true
            }]
        );
    }

    #[test]
    fn test_todo_index_bounds() {
        let dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        assert_eq!(
            call(&sandbox, TodoAction::Done, None, Some(1)).unwrap(),
            "No todos found"
        );

        call(&sandbox, TodoAction::Add, Some("only"), None).unwrap();
        assert_eq!(
            call(&sandbox, TodoAction::Remove, None, Some(2)).unwrap_err().to_string(),
            "Invalid todo number: 2"
        );
        assert!(call(&sandbox, TodoAction::Done, None, Some(0)).is_err());
    }

    #[test]
    fn test_todo_validation() {
        let missing_task = TodoParams {
            action: TodoAction::Add,
            task: None,
            index: None,
        };
        assert!(missing_task.validate().is_err());

        let missing_index = TodoParams {
            action: TodoAction::Remove,
            task: None,
            index: None,
        };
        assert!(missing_index.validate().is_err());
    }
}

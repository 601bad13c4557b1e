//! Conversation data model
//!
//! A [`Transcript`] is an append-only log of [`Turn`]s whose first entry is
//! always the single system turn. The only way to remove entries is
//! [`Transcript::compact_to`], which drops a contiguous run of the oldest
//! non-system turns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One logical message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Immutable instructions; always index 0
    System { content: String },
    /// Free text from the user
    User { content: String },
    /// Ordered parts returned by the model
    Model { parts: Vec<Part> },
    /// One result per tool call of the preceding model turn, in call order
    ToolResults { results: Vec<ToolResultPart> },
}

impl Turn {
    /// Tool calls carried by a model turn, in order
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallPart> {
        let parts: &[Part] = match self {
            Turn::Model { parts } => parts,
            _ => &[],
        };
        parts.iter().filter_map(|part| match part {
            Part::ToolCall(call) => Some(call),
            Part::Text { .. } => None,
        })
    }
}

/// A sub-unit of a model turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { content: String },
    ToolCall(ToolCallPart),
}

impl Part {
    pub fn text(content: impl Into<String>) -> Self {
        Part::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(
        tool_name: impl Into<String>,
        arguments: Value,
        call_id: impl Into<String>,
    ) -> Self {
        Part::ToolCall(ToolCallPart {
            tool_name: tool_name.into(),
            arguments,
            call_id: call_id.into(),
        })
    }
}

/// A structured tool invocation requested by the model
///
/// `arguments` is either a JSON object or a JSON string holding a
/// serialized object, depending on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub tool_name: String,
    pub arguments: Value,
    pub call_id: String,
}

/// The answer to one [`ToolCallPart`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_name: String,
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

/// A tool as advertised to the model: name, description and JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Token usage reported by one inference call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Cumulative usage for the process lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub requests: u64,
    /// Input tokens of the most recent request, compared against the trim budget
    pub last_input_tokens: u64,
}

impl UsageCounters {
    /// Fold one request's usage into the totals
    pub fn record(&mut self, usage: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(usage.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(usage.output_tokens);
        self.requests = self.requests.saturating_add(1);
        self.last_input_tokens = usage.input_tokens;
    }
}

/// Ordered conversation log, system turn first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Start a transcript holding only the system instructions
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::System {
                content: system_prompt.into(),
            }],
        }
    }

    pub fn system_prompt(&self) -> &str {
        match self.turns.first() {
            Some(Turn::System { content }) => content,
            _ => "",
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::User {
            content: content.into(),
        });
    }

    pub fn push_model(&mut self, parts: Vec<Part>) {
        self.turns.push(Turn::Model { parts });
    }

    pub fn push_tool_results(&mut self, results: Vec<ToolResultPart>) {
        self.turns.push(Turn::ToolResults { results });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns, including the system turn
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// A transcript always holds its system turn, so this is false for any
    /// value built through [`Transcript::new`]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop the oldest non-system turns until `target` turns remain.
    ///
    /// `target` is clamped to at least 2 so the system turn and the most
    /// recent turn always survive. Returns how many turns were removed.
    pub fn compact_to(&mut self, target: usize) -> usize {
        let target = target.max(2);
        if self.turns.len() <= target {
            return 0;
        }
        let excess = self.turns.len() - target;
        self.turns.drain(1..1 + excess);
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transcript_with_users(count: usize) -> Transcript {
        let mut transcript = Transcript::new("sys");
        for i in 0..count {
            transcript.push_user(format!("u{}", i));
        }
        transcript
    }

    #[test]
    fn test_new_transcript_holds_system_turn() {
        let transcript = Transcript::new("be helpful");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.system_prompt(), "be helpful");
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_compact_removes_oldest_non_system_turns() {
        let mut transcript = transcript_with_users(5);
        let removed = transcript.compact_to(3);

        assert_eq!(removed, 3);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.system_prompt(), "sys");
        assert_eq!(
            transcript.turns()[1],
            Turn::User {
                content: "u3".into()
            }
        );
        assert_eq!(
            transcript.last(),
            Some(&Turn::User {
                content: "u4".into()
            })
        );
    }

    #[test]
    fn test_compact_never_goes_below_two_turns() {
        let mut transcript = transcript_with_users(4);
        transcript.compact_to(0);
        assert_eq!(transcript.len(), 2);
        assert!(!transcript.is_empty());
        assert!(matches!(transcript.turns()[0], Turn::System { .. }));

        let mut short = transcript_with_users(1);
        assert_eq!(short.compact_to(1), 0);
        assert_eq!(short.len(), 2);
    }

    #[test]
    fn test_usage_counters_accumulate() {
        let mut counters = UsageCounters::default();
        counters.record(&Usage {
            input_tokens: 100,
            output_tokens: 10,
        });
        counters.record(&Usage {
            input_tokens: 40,
            output_tokens: 5,
        });

        assert_eq!(counters.input_tokens, 140);
        assert_eq!(counters.output_tokens, 15);
        assert_eq!(counters.requests, 2);
        assert_eq!(counters.last_input_tokens, 40);
    }

    #[test]
    fn test_tool_calls_iterates_only_calls() {
        let turn = Turn::Model {
            parts: vec![
                Part::text("looking"),
                Part::tool_call("read", json!({"path": "a"}), "c1"),
                Part::tool_call("ls", json!({}), "c2"),
            ],
        };
        let ids: Vec<_> = turn.tool_calls().map(|c| c.call_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let user = Turn::User {
            content: "hi".into(),
        };
        assert_eq!(user.tool_calls().count(), 0);
    }
}

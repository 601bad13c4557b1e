//! Anthropic Messages API backend
//!
//! Stateless: each call sends the full transcript. No retries; a failed
//! request ends the current user turn.

use crate::auth;
use crate::backend::{Completion, InferenceBackend};
use crate::types::{ContentBlock, Message, MessagesRequest, MessagesResponse, Role};
use async_trait::async_trait;
use skiff_core::{
    Part, Result, SkiffConfig, SkiffError, ToolDefinition, Transcript, Turn, Usage,
};
use skiff_tools::decode_arguments;
use std::collections::HashSet;
use std::fmt;
use tracing::instrument;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: usize = 8192;

/// Stand-in first message when trimming removed every user turn
const TRIMMED_PLACEHOLDER: &str = "[Earlier conversation was trimmed to fit the context budget.]";

/// Inference backend for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: usize,
}

impl fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Build from config, reading the API key from the configured env var
    pub fn from_config(config: &SkiffConfig) -> Result<Self> {
        let api_key = auth::api_key_from_env(&config.api.api_key_env)?;
        Ok(Self::new(api_key, config.agent.model.clone())
            .with_base_url(config.api.base_url.clone())
            .with_max_tokens(config.agent.max_output_tokens))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl InferenceBackend for AnthropicBackend {
    #[instrument(skip(self, transcript, tools), fields(model = %self.model, turns = transcript.len()))]
    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: transcript.system_prompt(),
            messages: to_messages(transcript),
            tools,
        };
        tracing::debug!(
            "Sending {} messages and {} tools to Anthropic API",
            request.messages.len(),
            tools.len()
        );

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SkiffError::Backend(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            tracing::error!("Anthropic API returned {}", status);
            return Err(SkiffError::Backend(format!(
                "Anthropic API error {}: {}",
                status, error_text
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SkiffError::Backend(format!("Failed to parse response: {}", e)))?;

        let completion = from_response(body);
        tracing::info!(
            "Model responded with {} parts ({} input tokens, {} output tokens)",
            completion.parts.len(),
            completion.usage.input_tokens,
            completion.usage.output_tokens
        );
        Ok(completion)
    }
}

/// Map the transcript (minus the system turn) onto API messages.
///
/// Tool results whose call no longer appears earlier (because trimming
/// removed it) are dropped, consecutive same-role messages are merged and the
/// first message is always a user message.
pub(crate) fn to_messages(transcript: &Transcript) -> Vec<Message> {
    let mut issued_calls: HashSet<&str> = HashSet::new();
    let mut messages: Vec<Message> = Vec::new();

    for turn in transcript.turns() {
        let (role, content) = match turn {
            Turn::System { .. } => continue,
            Turn::User { content } => (Role::User, vec![ContentBlock::Text {
                text: content.clone(),
            }]),
            Turn::Model { parts } => {
                let blocks = parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { content } if content.trim().is_empty() => None,
                        Part::Text { content } => Some(ContentBlock::Text {
                            text: content.clone(),
                        }),
                        Part::ToolCall(call) => {
                            issued_calls.insert(call.call_id.as_str());
                            Some(ContentBlock::ToolUse {
                                id: call.call_id.clone(),
                                name: call.tool_name.clone(),
                                input: decode_arguments(&call.arguments),
                            })
                        }
                    })
                    .collect();
                (Role::Assistant, blocks)
            }
            Turn::ToolResults { results } => {
                let blocks = results
                    .iter()
                    .filter(|result| issued_calls.contains(result.call_id.as_str()))
                    .map(|result| ContentBlock::ToolResult {
                        tool_use_id: result.call_id.clone(),
                        content: result.content.clone(),
                        is_error: result.is_error,
                    })
                    .collect();
                (Role::User, blocks)
            }
        };

        if content.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(content),
            _ => messages.push(Message { role, content }),
        }
    }

    if messages.first().map(|m| m.role) != Some(Role::User) {
        messages.insert(
            0,
            Message {
                role: Role::User,
                content: vec![ContentBlock::Text {
                    text: TRIMMED_PLACEHOLDER.to_string(),
                }],
            },
        );
    }

    messages
}

pub(crate) fn from_response(response: MessagesResponse) -> Completion {
    let parts = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(Part::text(text)),
            ContentBlock::ToolUse { id, name, input } => Some(Part::tool_call(name, input, id)),
            ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => None,
        })
        .collect();

    if let Some(reason) = &response.stop_reason {
        tracing::debug!("Stop reason: {}", reason);
    }

    Completion::new(
        parts,
        Usage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skiff_core::ToolResultPart;

    fn result(call_id: &str, content: &str) -> ToolResultPart {
        ToolResultPart {
            tool_name: "read".to_string(),
            call_id: call_id.to_string(),
            content: content.to_string(),
            is_error: false,
        }
    }

    #[test]
    fn test_maps_tool_round_trip() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("show main");
        transcript.push_model(vec![
            Part::text("Reading it"),
            Part::tool_call("read", json!("{\"path\": \"main.rs\"}"), "toolu_1"),
        ]);
        transcript.push_tool_results(vec![result("toolu_1", "fn main() {}")]);

        let messages = to_messages(&transcript);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(
            messages[1].content[1],
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "read".into(),
                input: json!({"path": "main.rs"}),
            }
        );
        assert_eq!(messages[2].role, Role::User);
        assert!(matches!(
            &messages[2].content[0],
            ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == "toolu_1"
        ));
    }

    #[test]
    fn test_orphaned_results_dropped_and_user_first() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("go");
        transcript.push_model(vec![Part::tool_call("ls", json!({}), "gone")]);
        transcript.push_tool_results(vec![result("gone", "a.txt")]);
        transcript.push_model(vec![Part::text("done")]);
        transcript.compact_to(3);

        // [sys, results(gone), model(done)]: the results lost their call
        let messages = to_messages(&transcript);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(
            messages[0].content[0],
            ContentBlock::Text {
                text: TRIMMED_PLACEHOLDER.into()
            }
        );
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_consecutive_user_messages_merge() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("one");
        transcript.push_user("two");
        let messages = to_messages(&transcript);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.len(), 2);
    }

    #[test]
    fn test_request_serialization() {
        let transcript = Transcript::new("be brief");
        let tools = skiff_tools::tool_catalog();
        let request = MessagesRequest {
            model: "claude-test",
            max_tokens: 100,
            system: transcript.system_prompt(),
            messages: to_messages(&transcript),
            tools: &tools,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["tools"][0]["name"], "read");
        assert!(value["tools"][0]["input_schema"].is_object());
    }

    #[test]
    fn test_parses_response() {
        let body: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "toolu_9", "name": "ls", "input": {"directory": "src"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1200, "output_tokens": 40}
        }))
        .unwrap();

        let completion = from_response(body);
        assert_eq!(
            completion.parts,
            vec![
                Part::text("Let me look."),
                Part::tool_call("ls", json!({"directory": "src"}), "toolu_9"),
            ]
        );
        assert_eq!(completion.usage.input_tokens, 1200);
        assert_eq!(completion.usage.output_tokens, 40);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let backend = AnthropicBackend::new("sk-secret", "claude-test");
        assert!(!format!("{:?}", backend).contains("sk-secret"));
    }
}

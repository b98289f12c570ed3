//! Anthropic Messages API chat model.
//!
//! Responses keep Anthropic's block structure: the assistant turn carries a
//! list of `text` and `tool_use` chunks instead of a single string.
//! API keys are only sent to the official Anthropic endpoint.

use super::{ChatModel, ChatRequest, Provider, ToolSpec};
use crate::error::{CoraError, Result};
use crate::message::{Chunk, Content, Message, Role, ToolCall};
use crate::openai::http_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Chat model on the Anthropic Messages API.
pub struct AnthropicChatModel {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicChatModel {
    /// Create a client for `model`, reading `ANTHROPIC_API_KEY` from the environment.
    ///
    /// A missing key is reported when the model is first invoked.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            model: model.to_string(),
            max_tokens: 4096,
            temperature: None,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn build_request(&self, request: &ChatRequest<'_>) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: request.system.map(str::to_string),
            messages: convert_messages(request.messages, !request.tools.is_empty()),
            tools: convert_tools(request.tools),
            temperature: self.temperature,
        }
    }

    async fn send_request(&self, request: &AnthropicRequest) -> Result<AnthropicResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CoraError::Config("ANTHROPIC_API_KEY not set".to_string()))?;

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoraError::Anthropic(format!("{}: {}", status, error_text)));
        }

        Ok(response.json::<AnthropicResponse>().await?)
    }
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<Message> {
        let body = self.build_request(&request);

        debug!("Sending {} messages to Anthropic", body.messages.len());
        let response = self.send_request(&body).await?;
        debug!("Anthropic stop reason: {:?}", response.stop_reason);

        Ok(into_message(response.content))
    }
}

/// Turn response blocks into an assistant message with chunk content.
fn into_message(blocks: Vec<Block>) -> Message {
    let mut chunks = Vec::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            Block::Text { text } => chunks.push(Chunk::Text { text }),
            Block::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    args: input.clone(),
                });
                chunks.push(Chunk::ToolUse { id, name, input });
            }
            Block::ToolResult { .. } | Block::Other => {}
        }
    }

    Message::assistant(Content::Chunks(chunks)).with_tool_calls(tool_calls)
}

fn convert_tools(tools: &[ToolSpec]) -> Option<Vec<AnthropicTool>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect(),
    )
}

/// Convert conversation turns to Anthropic messages.
///
/// Tool results travel as `tool_result` blocks in a user message; consecutive
/// results are merged into one message since roles must alternate.
///
/// The API rejects `tool_use` and `tool_result` blocks in a request without
/// tools, so when `tools_enabled` is false earlier tool traffic is replayed
/// as plain text.
fn convert_messages(messages: &[Message], tools_enabled: bool) -> Vec<AnthropicMessage> {
    let tool_use = |id: &str, name: &str, input: &Value| {
        if tools_enabled {
            Block::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            }
        } else {
            Block::Text {
                text: format!("[called {} with {}]", name, input),
            }
        }
    };

    let mut out: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        match message.role {
            Role::Human => out.push(AnthropicMessage {
                role: "user".to_string(),
                content: AnthropicContent::Text(message.text()),
            }),
            Role::Assistant => {
                let blocks = match &message.content {
                    Content::Chunks(chunks) => chunks
                        .iter()
                        .map(|c| match c {
                            Chunk::Text { text } => Block::Text { text: text.clone() },
                            Chunk::ToolUse { id, name, input } => tool_use(id, name, input),
                        })
                        .collect::<Vec<_>>(),
                    Content::Text(text) => {
                        // Turns from OpenAI-style providers keep calls outside the content
                        let mut blocks = Vec::new();
                        if !text.is_empty() {
                            blocks.push(Block::Text { text: text.clone() });
                        }
                        blocks.extend(
                            message
                                .tool_calls
                                .iter()
                                .map(|c| tool_use(&c.id, &c.name, &c.args)),
                        );
                        blocks
                    }
                };
                if blocks.is_empty() {
                    continue;
                }
                out.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: AnthropicContent::Blocks(blocks),
                });
            }
            Role::Tool => {
                let block = if tools_enabled {
                    Block::ToolResult {
                        tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                        content: message.text(),
                    }
                } else {
                    Block::Text {
                        text: format!(
                            "[{} returned: {}]",
                            message.name.as_deref().unwrap_or("tool"),
                            message.text()
                        ),
                    }
                };
                let merge = matches!(
                    out.last(),
                    Some(AnthropicMessage {
                        role,
                        content: AnthropicContent::Blocks(_),
                    }) if role == "user"
                );
                if merge {
                    if let Some(AnthropicMessage {
                        content: AnthropicContent::Blocks(blocks),
                        ..
                    }) = out.last_mut()
                    {
                        blocks.push(block);
                    }
                } else {
                    out.push(AnthropicMessage {
                        role: "user".to_string(),
                        content: AnthropicContent::Blocks(vec![block]),
                    });
                }
            }
        }
    }

    out
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<Block>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Block>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_keeps_chunk_shape() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me look that up."},
                {"type": "tool_use", "id": "toolu_1", "name": "tavily_search_results_json", "input": {"query": "weather"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        let message = into_message(response.content);
        assert_eq!(message.role, Role::Assistant);
        match &message.content {
            Content::Chunks(chunks) => assert_eq!(chunks.len(), 2),
            other => panic!("expected chunks, got {:?}", other),
        }
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].args, json!({"query": "weather"}));
    }

    #[test]
    fn test_consecutive_tool_results_are_merged() {
        let history = vec![
            Message::human("compare"),
            Message::assistant(Content::Text(String::new())).with_tool_calls(vec![
                ToolCall { id: "a".to_string(), name: "search".to_string(), args: json!({}) },
                ToolCall { id: "b".to_string(), name: "search".to_string(), args: json!({}) },
            ]),
            Message::tool("a", "search", "[1]"),
            Message::tool("b", "search", "[2]"),
        ];

        let converted = convert_messages(&history, true);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2].role, "user");
        match &converted[2].content {
            AnthropicContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected blocks, got {:?}", other),
        }

        let wire = serde_json::to_value(&converted[1]).unwrap();
        assert_eq!(wire["content"][0]["type"], "tool_use");
    }

    #[test]
    fn test_tool_history_replayed_as_text_when_search_is_off() {
        let history = vec![
            Message::human("weather in oslo?"),
            Message::assistant(Content::Chunks(vec![
                Chunk::Text { text: "Searching.".to_string() },
                Chunk::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "tavily_search_results_json".to_string(),
                    input: json!({"query": "oslo weather"}),
                },
            ])),
            Message::tool("toolu_1", "tavily_search_results_json", r#"[{"content": "sunny"}]"#),
            Message::assistant(Content::Chunks(vec![Chunk::Text { text: "Sunny.".to_string() }])),
            Message::human("thanks, and tomorrow?"),
        ];
        let model = AnthropicChatModel::new("claude", Duration::from_secs(5)).unwrap();

        let body = model.build_request(&ChatRequest {
            system: None,
            messages: &history,
            tools: &[],
        });
        let wire = serde_json::to_string(&body).unwrap();

        assert!(body.tools.is_none());
        assert!(!wire.contains("\"tool_use\""));
        assert!(!wire.contains("\"tool_result\""));
        assert!(wire.contains("[called tavily_search_results_json with"));
        assert!(wire.contains("tavily_search_results_json returned:"));

        let with_tools = model.build_request(&ChatRequest {
            system: None,
            messages: &history,
            tools: &[ToolSpec {
                name: "tavily_search_results_json".to_string(),
                description: "search".to_string(),
                parameters: json!({"type": "object"}),
            }],
        });
        let wire = serde_json::to_string(&with_tools).unwrap();
        assert!(wire.contains("\"tool_use\""));
        assert!(wire.contains("\"tool_result\""));
    }

    #[test]
    fn test_no_tools_omits_field() {
        let request = AnthropicRequest {
            model: "m".to_string(),
            max_tokens: 10,
            system: None,
            messages: vec![],
            tools: convert_tools(&[]),
            temperature: None,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("system").is_none());
    }
}

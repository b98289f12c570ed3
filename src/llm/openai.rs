//! OpenAI-compatible chat model (OpenAI and Groq).

use super::{ChatModel, ChatRequest, Provider, ToolSpec};
use crate::error::{CoraError, Result};
use crate::message::{Content, Message, Role, ToolCall};
use crate::openai::{create_client_with_timeout, create_groq_client};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model served through an OpenAI-compatible API.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    provider: Provider,
    model: String,
    temperature: f32,
    streaming: bool,
}

impl OpenAiChatModel {
    /// Create a model on the OpenAI API.
    pub fn openai(model: &str, temperature: f32, streaming: bool, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            provider: Provider::OpenAI,
            model: model.to_string(),
            temperature,
            streaming,
        })
    }

    /// Create a model on Groq's OpenAI-compatible API.
    pub fn groq(
        model: &str,
        api_base: &str,
        temperature: f32,
        streaming: bool,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_groq_client(api_base, timeout)?,
            provider: Provider::Groq,
            model: model.to_string(),
            temperature,
            streaming,
        })
    }

    fn build_request(&self, request: ChatRequest<'_>) -> Result<CreateChatCompletionRequest> {
        let messages = to_request_messages(request.system, request.messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature);

        // An empty tool array is rejected by the API
        if !request.tools.is_empty() {
            builder.tools(tool_definitions(request.tools));
        }

        builder.build().map_err(|e| CoraError::Provider(e.to_string()))
    }

    async fn invoke_blocking(&self, request: CreateChatCompletionRequest) -> Result<Message> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CoraError::OpenAI(format!("{} chat error: {}", self.provider, e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| CoraError::Provider("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .map(|c| ToolCall {
                        id: c.id.clone(),
                        name: c.function.name.clone(),
                        args: parse_arguments(&c.function.arguments),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let content = choice.message.content.clone().unwrap_or_default();
        Ok(Message::assistant(Content::Text(content)).with_tool_calls(tool_calls))
    }

    async fn invoke_streaming(&self, request: CreateChatCompletionRequest) -> Result<Message> {
        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| CoraError::OpenAI(format!("{} stream error: {}", self.provider, e)))?;

        let mut content = String::new();
        let mut partial = PartialToolCalls::default();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| CoraError::OpenAI(format!("{} stream error: {}", self.provider, e)))?;

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    content.push_str(&text);
                }
                for call in choice.delta.tool_calls.unwrap_or_default() {
                    let (name, arguments) = call
                        .function
                        .map(|f| (f.name, f.arguments))
                        .unwrap_or((None, None));
                    partial.push(call.index, call.id, name, arguments);
                }
            }
        }

        Ok(Message::assistant(Content::Text(content)).with_tool_calls(partial.finish()))
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(provider = %self.provider, model = %self.model))]
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<Message> {
        debug!(
            "Calling model with {} messages and {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let built = self.build_request(request)?;
        if self.streaming {
            self.invoke_streaming(built).await
        } else {
            self.invoke_blocking(built).await
        }
    }
}

/// Tool-call fragments accumulated from a streamed response, keyed by call index.
#[derive(Debug, Default)]
struct PartialToolCalls {
    calls: BTreeMap<u32, (String, String, String)>,
}

impl PartialToolCalls {
    fn push(&mut self, index: u32, id: Option<String>, name: Option<String>, arguments: Option<String>) {
        let entry = self.calls.entry(index).or_default();
        if let Some(id) = id {
            entry.0.push_str(&id);
        }
        if let Some(name) = name {
            entry.1.push_str(&name);
        }
        if let Some(arguments) = arguments {
            entry.2.push_str(&arguments);
        }
    }

    fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .map(|(id, name, arguments)| ToolCall {
                id,
                name,
                args: parse_arguments(&arguments),
            })
            .collect()
    }
}

/// Parse tool arguments, keeping unparseable payloads as a raw string.
fn parse_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}

fn tool_definitions(tools: &[ToolSpec]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|t| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: t.name.clone(),
                description: Some(t.description.clone()),
                parameters: Some(t.parameters.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Convert conversation turns to OpenAI request messages.
fn to_request_messages(
    system: Option<&str>,
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system {
        out.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| CoraError::Provider(e.to_string()))?
                .into(),
        );
    }

    for message in messages {
        let converted: ChatCompletionRequestMessage = match message.role {
            Role::Human => ChatCompletionRequestUserMessageArgs::default()
                .content(message.text())
                .build()
                .map_err(|e| CoraError::Provider(e.to_string()))?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                let text = message.text();
                if !text.is_empty() {
                    builder.content(text);
                }
                if message.has_tool_calls() {
                    builder.tool_calls(
                        message
                            .tool_calls
                            .iter()
                            .map(|c| ChatCompletionMessageToolCall {
                                id: c.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: c.name.clone(),
                                    arguments: c.args.to_string(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                builder
                    .build()
                    .map_err(|e| CoraError::Provider(e.to_string()))?
                    .into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
                .content(message.text())
                .build()
                .map_err(|e| CoraError::Provider(e.to_string()))?
                .into(),
        };
        out.push(converted);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Chunk;
    use serde_json::json;

    #[test]
    fn test_partial_tool_calls_reassemble_fragments() {
        let mut partial = PartialToolCalls::default();
        partial.push(0, Some("call_1".to_string()), Some("tavily_search_results_json".to_string()), Some("{\"que".to_string()));
        partial.push(0, None, None, Some("ry\": \"rust\"}".to_string()));
        partial.push(1, Some("call_2".to_string()), Some("other".to_string()), None);

        let calls = partial.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].args, json!({"query": "rust"}));
        assert_eq!(calls[1].args, json!({}));
    }

    #[test]
    fn test_parse_arguments_keeps_raw_on_invalid_json() {
        assert_eq!(parse_arguments("not json"), Value::String("not json".to_string()));
    }

    #[test]
    fn test_to_request_messages_covers_all_roles() {
        let history = vec![
            Message::human("hi"),
            Message::assistant(Content::Chunks(vec![
                Chunk::Text { text: "Looking".to_string() },
                Chunk::ToolUse {
                    id: "t1".to_string(),
                    name: "search".to_string(),
                    input: json!({"query": "x"}),
                },
            ]))
            .with_tool_calls(vec![ToolCall {
                id: "t1".to_string(),
                name: "search".to_string(),
                args: json!({"query": "x"}),
            }]),
            Message::tool("t1", "search", "{}"),
        ];

        let converted = to_request_messages(Some("be kind"), &history).unwrap();
        assert_eq!(converted.len(), 4);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));
    }
}

//! Projection of agent events into displayable items and session history.
//!
//! Assistant text is appended to history once per assistant message, no
//! matter how many text chunks it carries. Tool invocations and tool results
//! are shown to the user but never enter the history.

use crate::agent::AgentEvent;
use crate::message::{Chunk, Content, Message, Role};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

/// One item for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    /// Assistant text (markdown).
    Text { text: String },
    /// The model asked for a tool.
    ToolCalled { name: String, payload: Value },
    /// A tool answered.
    ToolResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        payload: Value,
    },
    /// The request as rewritten by the prompt engineer.
    Rewritten { text: String },
}

/// Project one agent event, appending recognized assistant text to `history`.
pub fn project_event(event: &AgentEvent, history: &mut Vec<Message>) -> Vec<Rendered> {
    trace!("Projecting {:?} event with {} message(s)", event.node, event.messages.len());

    let mut out = Vec::new();
    for message in &event.messages {
        match message.role {
            Role::Tool => out.push(Rendered::ToolResponse {
                name: message.name.clone(),
                payload: parse_payload(&message.text()),
            }),
            Role::Assistant => project_assistant(message, history, &mut out),
            Role::Human => {}
        }
    }
    out
}

fn project_assistant(message: &Message, history: &mut Vec<Message>, out: &mut Vec<Rendered>) {
    match &message.content {
        Content::Text(text) => {
            if !text.is_empty() {
                out.push(Rendered::Text { text: text.clone() });
                history.push(Message::assistant(Content::Text(text.clone())));
            }
            for call in &message.tool_calls {
                out.push(Rendered::ToolCalled {
                    name: call.name.clone(),
                    payload: json!({ "id": call.id, "name": call.name, "args": call.args }),
                });
            }
        }
        Content::Chunks(chunks) => {
            let mut texts = Vec::new();
            for chunk in chunks {
                match chunk {
                    Chunk::Text { text } => {
                        out.push(Rendered::Text { text: text.clone() });
                        texts.push(text.as_str());
                    }
                    Chunk::ToolUse { name, .. } => out.push(Rendered::ToolCalled {
                        name: name.clone(),
                        payload: serde_json::to_value(chunk).unwrap_or(Value::Null),
                    }),
                }
            }
            if !texts.is_empty() {
                history.push(Message::assistant(Content::Text(texts.join("\n"))));
            }
        }
    }
}

/// Tool output is JSON when the tool produced JSON, otherwise a plain string.
fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Node;
    use crate::message::ToolCall;

    fn agent_event(messages: Vec<Message>) -> AgentEvent {
        AgentEvent {
            node: Node::Agent,
            messages,
        }
    }

    #[test]
    fn test_string_content_is_appended() {
        let mut history = vec![Message::human("hi")];
        let rendered = project_event(
            &agent_event(vec![Message::assistant(Content::Text("Hello! 👋".to_string()))]),
            &mut history,
        );

        assert_eq!(rendered, vec![Rendered::Text { text: "Hello! 👋".to_string() }]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_empty_string_with_tool_call_is_display_only() {
        let mut history = Vec::new();
        let message = Message::assistant(Content::Text(String::new())).with_tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "tavily_search_results_json".to_string(),
            args: json!({"query": "weather"}),
        }]);

        let rendered = project_event(&agent_event(vec![message]), &mut history);

        assert!(history.is_empty());
        match &rendered[0] {
            Rendered::ToolCalled { name, payload } => {
                assert_eq!(name, "tavily_search_results_json");
                assert_eq!(payload["args"]["query"], "weather");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_list_appends_text_once() {
        let mut history = Vec::new();
        let message = Message::assistant(Content::Chunks(vec![
            Chunk::Text { text: "Let me search.".to_string() },
            Chunk::ToolUse {
                id: "toolu_1".to_string(),
                name: "tavily_search_results_json".to_string(),
                input: json!({"query": "weather"}),
            },
            Chunk::Text { text: "One moment.".to_string() },
        ]));

        let rendered = project_event(&agent_event(vec![message]), &mut history);

        assert_eq!(rendered.len(), 3);
        assert!(matches!(rendered[1], Rendered::ToolCalled { .. }));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text(), "Let me search.\nOne moment.");
    }

    #[test]
    fn test_tool_message_is_display_only() {
        let mut history = Vec::new();
        let event = AgentEvent {
            node: Node::Tools,
            messages: vec![
                Message::tool("call_1", "tavily_search_results_json", r#"[{"url": "https://example.com"}]"#),
                Message::tool("call_2", "tavily_search_results_json", "Error: timeout"),
            ],
        };

        let rendered = project_event(&event, &mut history);

        assert!(history.is_empty());
        assert_eq!(
            rendered[0],
            Rendered::ToolResponse {
                name: Some("tavily_search_results_json".to_string()),
                payload: json!([{"url": "https://example.com"}]),
            }
        );
        assert!(matches!(&rendered[1], Rendered::ToolResponse { payload: Value::String(s), .. } if s == "Error: timeout"));
    }

    #[test]
    fn test_rendered_wire_shape() {
        let value = serde_json::to_value(Rendered::Text { text: "hi".to_string() }).unwrap();
        assert_eq!(value, json!({"kind": "text", "text": "hi"}));
    }
}

//! Conversation turns exchanged between the user, the model and its tools.
//!
//! Content is either a plain string or a list of typed chunks. Which one a
//! model produces depends on the provider: OpenAI-style APIs answer with a
//! string, the Anthropic Messages API answers with `text` and `tool_use`
//! blocks. Both shapes are kept as-is so the presentation layer can handle
//! them the way the provider sent them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Human => write!(f, "human"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One typed unit of structured model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

/// Message payload: plain text or a list of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Chunks(Vec<Chunk>),
}

impl Content {
    /// Concatenated text of the payload, ignoring non-text chunks.
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Chunks(chunks) => chunks
                .iter()
                .filter_map(|c| match c {
                    Chunk::Text { text } => Some(text.as_str()),
                    Chunk::ToolUse { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Chunks(chunks) => chunks.is_empty(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// A tool invocation requested by the model, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    /// Tool calls requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Id of the call a tool turn answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced a tool turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the user typed when `content` holds a rewritten prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Message {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: Content::Text(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            display: None,
        }
    }

    pub fn assistant(content: Content) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            display: None,
        }
    }

    pub fn tool(call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Content::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            display: None,
        }
    }

    /// Attach tool calls to an assistant turn.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Keep the text the user typed alongside a rewritten prompt.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Drop requested tool calls, including `tool_use` chunks.
    pub fn without_tool_calls(mut self) -> Self {
        self.tool_calls.clear();
        if let Content::Chunks(chunks) = &mut self.content {
            chunks.retain(|c| matches!(c, Chunk::Text { .. }));
        }
        self
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Text to show the user for this turn.
    pub fn display_text(&self) -> String {
        self.display.clone().unwrap_or_else(|| self.text())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_wire_shape() {
        let chunk: Chunk = serde_json::from_value(json!({
            "type": "tool_use",
            "id": "toolu_1",
            "name": "tavily_search_results_json",
            "input": {"query": "weather"}
        }))
        .unwrap();

        assert_eq!(
            chunk,
            Chunk::ToolUse {
                id: "toolu_1".to_string(),
                name: "tavily_search_results_json".to_string(),
                input: json!({"query": "weather"}),
            }
        );
    }

    #[test]
    fn test_content_text_skips_tool_use() {
        let content = Content::Chunks(vec![
            Chunk::Text { text: "Let me check.".to_string() },
            Chunk::ToolUse {
                id: "1".to_string(),
                name: "search".to_string(),
                input: json!({}),
            },
            Chunk::Text { text: "Done.".to_string() },
        ]);
        assert_eq!(content.text(), "Let me check.\nDone.");
    }

    #[test]
    fn test_untagged_content_accepts_both_shapes() {
        let text: Content = serde_json::from_value(json!("hi")).unwrap();
        assert_eq!(text, Content::Text("hi".to_string()));

        let chunks: Content = serde_json::from_value(json!([{"type": "text", "text": "hi"}])).unwrap();
        assert_eq!(chunks, Content::Chunks(vec![Chunk::Text { text: "hi".to_string() }]));
    }
}

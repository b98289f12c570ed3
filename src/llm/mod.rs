//! Hosted chat model clients.
//!
//! Every selectable LLM maps to one provider client behind the [`ChatModel`]
//! trait. OpenAI and Groq share the OpenAI-compatible client; Anthropic has
//! its own Messages API client.

mod anthropic;
mod openai;

pub use anthropic::AnthropicChatModel;
pub use openai::OpenAiChatModel;

use crate::config::ModelSettings;
use crate::error::{CoraError, Result};
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Hosted service behind a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Groq => write!(f, "groq"),
        }
    }
}

/// The LLMs a user can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    OpenAiGpt4o,
    AnthropicClaude35,
    Grok,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::AnthropicClaude35,
        ModelChoice::OpenAiGpt4o,
        ModelChoice::Grok,
    ];

    /// Name shown in model selectors.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelChoice::OpenAiGpt4o => "OpenAI GPT 4o",
            ModelChoice::AnthropicClaude35 => "Anthropic Claude 3.5",
            ModelChoice::Grok => "Grok",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ModelChoice::OpenAiGpt4o => Provider::OpenAI,
            ModelChoice::AnthropicClaude35 => Provider::Anthropic,
            ModelChoice::Grok => Provider::Groq,
        }
    }

    /// Hosted model identifier for this choice.
    pub fn model_id<'a>(&self, models: &'a ModelSettings) -> &'a str {
        match self {
            ModelChoice::OpenAiGpt4o => &models.openai_model,
            ModelChoice::AnthropicClaude35 => &models.anthropic_model,
            ModelChoice::Grok => &models.groq_model,
        }
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = CoraError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai gpt 4o" | "gpt-4o" | "gpt4o" | "openai" => Ok(ModelChoice::OpenAiGpt4o),
            "anthropic claude 3.5" | "claude" | "claude-3.5" | "anthropic" => {
                Ok(ModelChoice::AnthropicClaude35)
            }
            "grok" | "groq" | "llama3" => Ok(ModelChoice::Grok),
            _ => Err(CoraError::UnknownModel(s.to_string())),
        }
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: Value,
}

/// One model call: system instructions, the conversation so far, and the tools on offer.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: Option<&'a str>,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// A chat-capable hosted model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> Provider;

    /// Hosted model identifier.
    fn model(&self) -> &str;

    /// Produce the next assistant turn.
    async fn invoke(&self, request: ChatRequest<'_>) -> Result<Message>;
}

/// Map an LLM name to a configured client.
///
/// Fails with [`CoraError::UnknownModel`] for any name that is not a supported choice.
pub fn get_chat_model(
    llm: &str,
    models: &ModelSettings,
    temperature: f32,
    streaming: bool,
) -> Result<Box<dyn ChatModel>> {
    let choice: ModelChoice = llm.parse()?;
    let timeout = Duration::from_secs(models.request_timeout_secs);
    let model_id = choice.model_id(models);

    let model: Box<dyn ChatModel> = match choice.provider() {
        Provider::OpenAI => Box::new(OpenAiChatModel::openai(model_id, temperature, streaming, timeout)?),
        Provider::Groq => Box::new(OpenAiChatModel::groq(
            model_id,
            &models.groq_api_base,
            temperature,
            streaming,
            timeout,
        )?),
        Provider::Anthropic => Box::new(
            AnthropicChatModel::new(model_id, timeout)?
                .with_temperature(temperature)
                .with_max_tokens(models.anthropic_max_tokens),
        ),
    };

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_choice_parses_from_display_name() {
        for choice in ModelChoice::ALL {
            assert_eq!(choice.display_name().parse::<ModelChoice>().unwrap(), choice);
        }
    }

    #[test]
    fn test_get_chat_model_supported_names() {
        let models = ModelSettings::default();
        let cases = [
            ("OpenAI GPT 4o", Provider::OpenAI, "gpt-4o"),
            ("Anthropic Claude 3.5", Provider::Anthropic, "claude-3-5-sonnet-20240620"),
            ("Grok", Provider::Groq, "llama3-70b-8192"),
        ];

        for (name, provider, id) in cases {
            let model = get_chat_model(name, &models, 0.7, true).unwrap();
            assert_eq!(model.provider(), provider);
            assert_eq!(model.model(), id);
        }
    }

    #[test]
    fn test_get_chat_model_unknown_name() {
        let models = ModelSettings::default();
        let err = get_chat_model("Gemini Ultra", &models, 0.7, true)
            .err()
            .expect("unknown model must fail");
        assert!(matches!(err, CoraError::UnknownModel(ref name) if name == "Gemini Ultra"));
        assert_eq!(err.to_string(), "Unknown LLM: Gemini Ultra");
    }
}

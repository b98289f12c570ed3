//! Pre-flight checks before hosted API calls.
//!
//! Validates that the API keys an operation needs are present before a
//! session starts, instead of failing on the first request.

use crate::agent::ChatSettings;
use crate::error::{CoraError, Result};
use crate::llm::Provider;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Chatting needs the selected provider's key.
    Chat(Provider),
    /// Web search needs the Tavily key.
    Search,
    /// Voice input uses Whisper.
    Transcribe,
}

/// Environment variable holding the key for a provider.
pub fn provider_key_var(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAI => "OPENAI_API_KEY",
        Provider::Anthropic => "ANTHROPIC_API_KEY",
        Provider::Groq => "GROQ_API_KEY",
    }
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Chat(provider) => check_api_key(provider_key_var(provider)),
        Operation::Search => check_api_key("TAVILY_API_KEY"),
        Operation::Transcribe => check_api_key("OPENAI_API_KEY"),
    }
}

/// Check everything a chat configuration will need.
///
/// The model name is validated first so an unknown LLM is reported as such.
pub fn check_chat(chat: &ChatSettings, rewrite_provider: Option<Provider>) -> Result<()> {
    let choice = chat.model_choice()?;
    check(Operation::Chat(choice.provider()))?;
    if chat.search_web {
        check(Operation::Search)?;
    }
    if chat.prompt_engineer {
        if let Some(provider) = rewrite_provider {
            check(Operation::Chat(provider))?;
        }
    }
    Ok(())
}

/// Whether an API key variable is set and non-empty.
pub fn is_key_set(var: &str) -> bool {
    std::env::var(var).is_ok_and(|k| !k.is_empty())
}

fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CoraError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(CoraError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key_vars() {
        assert_eq!(provider_key_var(Provider::OpenAI), "OPENAI_API_KEY");
        assert_eq!(provider_key_var(Provider::Anthropic), "ANTHROPIC_API_KEY");
        assert_eq!(provider_key_var(Provider::Groq), "GROQ_API_KEY");
    }

    #[test]
    fn test_check_chat_reports_unknown_model_first() {
        let chat = ChatSettings {
            llm: "GPT-2".to_string(),
            search_web: true,
            prompt_engineer: false,
        };
        assert!(matches!(check_chat(&chat, None), Err(CoraError::UnknownModel(_))));
    }

    #[test]
    fn test_missing_key_message_names_variable() {
        let err = check_api_key("CORA_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("CORA_TEST_KEY_THAT_IS_NEVER_SET not set"));
    }
}

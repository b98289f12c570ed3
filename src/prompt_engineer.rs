//! Request rewriting before the agent sees it.
//!
//! A second, cheaper model rewrites the raw user request with extra context
//! and keywords. The output is used as-is.

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{get_chat_model, ChatModel, ChatRequest};
use crate::message::Message;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Rewrites user requests through a dedicated model call.
pub struct PromptEngineer {
    model: Box<dyn ChatModel>,
    prompts: Prompts,
}

impl PromptEngineer {
    pub fn new(model: Box<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// Build the rewriter on the configured LLM (Groq by default), non-streaming.
    pub fn from_settings(settings: &Settings, prompts: Prompts) -> Result<Self> {
        let model = get_chat_model(
            &settings.prompt_engineer.llm,
            &settings.models,
            settings.prompt_engineer.temperature,
            false,
        )?;
        Ok(Self::new(model, prompts))
    }

    /// Rewrite a user request.
    #[instrument(skip(self), fields(model = %self.model.model()))]
    pub async fn rewrite(&self, user_request: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("user_request".to_string(), user_request.to_string());
        let human = self
            .prompts
            .render_with_custom(&self.prompts.prompt_engineer.user, &vars);

        let reply = self
            .model
            .invoke(ChatRequest {
                system: Some(self.prompts.prompt_engineer.system.as_str()),
                messages: &[Message::human(human)],
                tools: &[],
            })
            .await?;

        let rewritten = reply.text().trim().to_string();
        debug!("Rewrote request into {} chars", rewritten.len());
        Ok(rewritten)
    }
}

//! Settings → agent mapping.

use super::runner::Agent;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{get_chat_model, ModelChoice};
use crate::memory::Checkpointer;
use crate::tools::{create_tools, ToolToggles};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Per-interaction choices: the selected LLM and feature toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub llm: String,
    #[serde(default)]
    pub search_web: bool,
    #[serde(default)]
    pub prompt_engineer: bool,
}

impl ChatSettings {
    /// Defaults taken from the configuration file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            llm: settings.models.default_llm.clone(),
            search_web: settings.agent.search_web,
            prompt_engineer: settings.agent.prompt_engineer,
        }
    }

    /// Validate the selected LLM name.
    pub fn model_choice(&self) -> Result<ModelChoice> {
        self.llm.parse()
    }

    pub fn tool_toggles(&self) -> ToolToggles {
        ToolToggles {
            search_web: self.search_web,
        }
    }
}

/// Builds an agent for each request.
pub trait AgentFactory: Send + Sync {
    fn build(&self, chat: &ChatSettings) -> Result<Agent>;

    /// Checkpointer shared by every agent this factory builds.
    fn checkpointer(&self) -> Arc<dyn Checkpointer>;
}

/// Assemble an agent from settings: hosted model, tools, shared memory, system prompt.
///
/// Fails immediately for an unrecognized LLM name.
pub fn create_agent(
    chat: &ChatSettings,
    settings: &Settings,
    prompts: &Prompts,
    checkpointer: Arc<dyn Checkpointer>,
) -> Result<Agent> {
    let model = get_chat_model(
        &chat.llm,
        &settings.models,
        settings.agent.temperature,
        settings.agent.streaming,
    )?;
    let tools = create_tools(chat.tool_toggles(), settings)?;

    debug!(
        "Built agent on {} with {} tool(s)",
        model.model(),
        tools.len()
    );

    Ok(Agent::new(model, tools, checkpointer)
        .with_system_prompt(&prompts.assistant_system())
        .with_max_iterations(settings.agent.max_iterations))
}

/// Factory over the hosted providers.
pub struct HostedAgentFactory {
    settings: Settings,
    prompts: Prompts,
    checkpointer: Arc<dyn Checkpointer>,
}

impl HostedAgentFactory {
    pub fn new(settings: Settings, prompts: Prompts, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            settings,
            prompts,
            checkpointer,
        }
    }
}

impl AgentFactory for HostedAgentFactory {
    fn build(&self, chat: &ChatSettings) -> Result<Agent> {
        create_agent(chat, &self.settings, &self.prompts, self.checkpointer.clone())
    }

    fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        self.checkpointer.clone()
    }
}

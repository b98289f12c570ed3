//! Configuration module for Cora.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, PromptEngineerPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, MemoryProvider, MemorySettings, ModelSettings,
    PromptEngineerSettings, PromptSettings, SearchSettings, ServerSettings, Settings,
    TranscriptionSettings,
};

//! Configuration settings for Cora.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub models: ModelSettings,
    pub agent: AgentSettings,
    pub prompt_engineer: PromptEngineerSettings,
    pub search: SearchSettings,
    pub transcription: TranscriptionSettings,
    pub memory: MemorySettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.cora".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Hosted model identifiers behind each selectable LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// LLM selected when none is given on the command line.
    pub default_llm: String,
    /// OpenAI model for "OpenAI GPT 4o".
    pub openai_model: String,
    /// Anthropic model for "Anthropic Claude 3.5".
    pub anthropic_model: String,
    /// Groq model for "Grok".
    pub groq_model: String,
    /// Groq OpenAI-compatible API base.
    pub groq_api_base: String,
    /// Max tokens per Anthropic response (the API requires it).
    pub anthropic_max_tokens: u32,
    /// HTTP timeout for hosted model calls.
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            default_llm: "Anthropic Claude 3.5".to_string(),
            openai_model: "gpt-4o".to_string(),
            anthropic_model: "claude-3-5-sonnet-20240620".to_string(),
            groq_model: "llama3-70b-8192".to_string(),
            groq_api_base: "https://api.groq.com/openai/v1".to_string(),
            anthropic_max_tokens: 4096,
            request_timeout_secs: 300,
        }
    }
}

/// Agent loop settings and default feature toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Sampling temperature for the chat model.
    pub temperature: f32,
    /// Request streamed responses from providers that support it.
    pub streaming: bool,
    /// Upper bound on model calls per turn.
    pub max_iterations: usize,
    /// Enable the web search tool by default.
    pub search_web: bool,
    /// Rewrite requests through the prompt engineer by default.
    pub prompt_engineer: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            streaming: true,
            max_iterations: 15,
            search_web: false,
            prompt_engineer: false,
        }
    }
}

/// Settings for the request rewrite pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptEngineerSettings {
    /// LLM used for the rewrite call.
    pub llm: String,
    /// Sampling temperature for the rewrite call.
    pub temperature: f32,
}

impl Default for PromptEngineerSettings {
    fn default() -> Self {
        Self {
            llm: "Grok".to_string(),
            temperature: 0.5,
        }
    }
}

/// Web search tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Tavily search endpoint.
    pub api_url: String,
    /// Maximum number of results returned to the model.
    pub max_results: u32,
    /// Search depth ("basic" or "advanced").
    pub search_depth: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.tavily.com/search".to_string(),
            max_results: 5,
            search_depth: "basic".to_string(),
        }
    }
}

/// Voice transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Checkpoint store provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryProvider {
    /// Persist checkpoints to SQLite (default).
    #[default]
    Sqlite,
    /// Keep checkpoints in process memory only.
    Memory,
}

impl std::str::FromStr for MemoryProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(MemoryProvider::Sqlite),
            "memory" | "in-memory" => Ok(MemoryProvider::Memory),
            _ => Err(format!("Unknown memory provider: {}", s)),
        }
    }
}

impl std::fmt::Display for MemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryProvider::Sqlite => write!(f, "sqlite"),
            MemoryProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Checkpoint store provider (sqlite, memory).
    pub provider: MemoryProvider,
    /// Path to the SQLite checkpoint database.
    pub sqlite_path: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            provider: MemoryProvider::Sqlite,
            sqlite_path: "~/.cora/checkpoints.db".to_string(),
        }
    }
}

/// HTTP API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Unload sessions untouched for this many seconds; they reload from memory on demand.
    pub session_idle_secs: u64,
    /// Most sessions held in memory at once.
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_idle_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CoraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cora")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite checkpoint path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.memory.sqlite_path)
    }
}

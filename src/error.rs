//! Error types for Cora.

use thiserror::Error;

/// Library-level error type for Cora operations.
#[derive(Error, Debug)]
pub enum CoraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown LLM: {0}")]
    UnknownModel(String),

    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Anthropic API error: {0}")]
    Anthropic(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Checkpoint store error: {0}")]
    Checkpoint(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Agent exceeded maximum iterations ({0})")]
    RecursionLimit(usize),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Cora operations.
pub type Result<T> = std::result::Result<T, CoraError>;

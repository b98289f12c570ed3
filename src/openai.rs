//! OpenAI-compatible client configuration with sensible defaults.
//!
//! Groq exposes an OpenAI-compatible endpoint, so both providers share
//! `async-openai` and only differ in API base and key.

use crate::error::{CoraError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for hosted API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client(timeout)?))
}

/// Create a Groq client against its OpenAI-compatible API base.
///
/// Reads `GROQ_API_KEY`; a missing key surfaces as an authentication error on first call.
pub fn create_groq_client(api_base: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base)
        .with_api_key(std::env::var("GROQ_API_KEY").unwrap_or_default());

    Ok(Client::with_config(config).with_http_client(http_client(timeout)?))
}

/// Build a reqwest client with the given timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoraError::Config(format!("Failed to create HTTP client: {}", e)))
}

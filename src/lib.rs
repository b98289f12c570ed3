//! Cora - chat with hosted LLM agents
//!
//! A conversational front end over tool-using agents backed by OpenAI,
//! Anthropic or Groq models.
//!
//! # Overview
//!
//! Cora allows you to:
//! - Pick one of three hosted LLMs per turn
//! - Let the agent search the web (Tavily)
//! - Rewrite requests with a prompt engineer before the agent sees them
//! - Speak instead of type (Whisper transcription)
//! - Keep conversations across turns and restarts, keyed by session id
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Hosted chat models behind one trait
//! - `tools` - Tools offered to the agent (web search)
//! - `memory` - Conversation checkpoints (in-memory or SQLite)
//! - `agent` - The model/tool loop and the settings → agent mapping
//! - `prompt_engineer` - Optional request rewriting
//! - `transcription` - Voice input
//! - `chat` - Sessions, turn handling and event projection
//! - `cli` - Terminal chat and HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use cora::agent::ChatSettings;
//! use cora::chat::{ChatService, Session};
//! use cora::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let service = ChatService::from_settings(&settings)?;
//!     let chat = ChatSettings::from_settings(&settings);
//!
//!     let mut session = Session::new();
//!     service
//!         .submit(&mut session, &chat, "What's new in Rust?", |item| println!("{:?}", item))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod message;
pub mod openai;
pub mod prompt_engineer;
pub mod tools;
pub mod transcription;

pub use error::{CoraError, Result};

//! CLI module for Cora.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Cora - chat with hosted LLM agents
///
/// Talk to OpenAI, Anthropic or Groq models, optionally with web search,
/// prompt rewriting and voice input. Conversations are remembered per session.
#[derive(Parser, Debug)]
#[command(name = "cora")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CORA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-interaction choices shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// LLM to use ("OpenAI GPT 4o", "Anthropic Claude 3.5", "Grok")
    #[arg(short, long)]
    pub llm: Option<String>,

    /// Let the agent search the web
    #[arg(short, long)]
    pub search_web: bool,

    /// Rewrite each request with the prompt engineer first
    #[arg(short, long)]
    pub prompt_engineer: bool,

    /// Resume a session by id
    #[arg(long)]
    pub session: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        args: ChatArgs,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,

        #[command(flatten)]
        args: ChatArgs,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Path to an audio file (wav, mp3, m4a, webm, ...)
        file: PathBuf,
    },

    /// Start the HTTP chat API
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the selectable LLMs
    Models,

    /// List stored sessions, or print one session's history
    History {
        /// Session id
        session: Option<String>,
    },

    /// Show what Cora is and how it is configured
    About,

    /// Check API keys and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

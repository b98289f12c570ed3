//! About command.

use crate::cli::Output;
use crate::config::Settings;
use console::style;

/// Describe Cora and the active defaults.
pub fn run_about(settings: &Settings) {
    println!("\n{} {}", style("Cora").bold().magenta(), style(env!("CARGO_PKG_VERSION")).dim());
    println!("A conversational assistant over hosted LLM agents.");
    println!();
    Output::list_item("Pick OpenAI GPT 4o, Anthropic Claude 3.5 or Grok (Groq llama3)");
    Output::list_item("Let the agent search the web with Tavily");
    Output::list_item("Have a prompt engineer rewrite requests before they reach the agent");
    Output::list_item("Speak instead of type: clips are transcribed with Whisper");
    Output::list_item("Conversations are remembered per session");

    Output::header("Defaults");
    Output::kv("LLM", &settings.models.default_llm);
    Output::kv("Web search", if settings.agent.search_web { "on" } else { "off" });
    Output::kv("Prompt engineer", if settings.agent.prompt_engineer { "on" } else { "off" });
    Output::kv("Memory", &settings.memory.provider.to_string());
    Output::kv("Config", &Settings::default_config_path().display().to_string());
}

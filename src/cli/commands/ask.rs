//! Ask command implementation.

use super::chat::{open_session, preflight_chat, resolve_chat};
use crate::chat::ChatService;
use crate::cli::{ChatArgs, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command: one turn, printed as it streams.
pub async fn run_ask(question: &str, args: &ChatArgs, settings: Settings) -> Result<()> {
    let chat = resolve_chat(args, &settings);
    preflight_chat(&chat, &settings)?;

    let service = ChatService::from_settings(&settings)?;
    let mut session = open_session(&service, args.session.as_deref()).await?;

    let spinner = Output::spinner("Thinking...");
    let result = service
        .submit(&mut session, &chat, question, |item| spinner.suspend(|| Output::rendered(item)))
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(Some(_)) => {
            println!();
            Output::kv("Session", &session.id);
        }
        Ok(None) => Output::warning("Nothing to ask."),
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

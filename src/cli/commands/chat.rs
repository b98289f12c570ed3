//! Interactive chat command.

use crate::agent::ChatSettings;
use crate::chat::{ChatService, Session};
use crate::cli::preflight::{self, Operation};
use crate::cli::{ChatArgs, Output};
use crate::config::Settings;
use crate::llm::ModelChoice;
use crate::transcription::AudioClip;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

/// Merge command-line choices over the configured defaults.
pub(crate) fn resolve_chat(args: &ChatArgs, settings: &Settings) -> ChatSettings {
    let mut chat = ChatSettings::from_settings(settings);
    if let Some(llm) = &args.llm {
        chat.llm = llm.clone();
    }
    chat.search_web |= args.search_web;
    chat.prompt_engineer |= args.prompt_engineer;
    chat
}

/// Check keys for a chat configuration, printing a hint on failure.
pub(crate) fn preflight_chat(chat: &ChatSettings, settings: &Settings) -> crate::error::Result<()> {
    let rewrite_provider = settings
        .prompt_engineer
        .llm
        .parse::<ModelChoice>()
        .ok()
        .map(|c| c.provider());

    preflight::check_chat(chat, rewrite_provider).inspect_err(|e| {
        Output::error(&e.to_string());
        Output::info("Run 'cora doctor' for detailed diagnostics.");
    })
}

/// Open the requested session or start a new one.
pub(crate) async fn open_session(service: &ChatService, id: Option<&str>) -> Result<Session> {
    match id {
        Some(id) => {
            let checkpointer = service.agents().checkpointer();
            Ok(Session::restore(id, checkpointer.as_ref()).await?)
        }
        None => Ok(Session::new()),
    }
}

/// Run the interactive chat command.
pub async fn run_chat(args: &ChatArgs, settings: Settings) -> Result<()> {
    let mut chat = resolve_chat(args, &settings);
    preflight_chat(&chat, &settings)?;

    let service = ChatService::from_settings(&settings)?;
    let mut session = open_session(&service, args.session.as_deref()).await?;

    println!("\n{}", style("Cora").bold().magenta());
    println!(
        "{}",
        style("Type a message, /help for commands, or 'exit' to quit.").dim()
    );
    Output::kv("Session", &session.id);
    print_settings(&chat);
    println!();

    for message in &session.history {
        Output::turn(message);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if let Some(command) = input.strip_prefix('/') {
            if let Err(e) = handle_command(command, &service, &mut session, &mut chat).await {
                Output::error(&e.to_string());
            }
            continue;
        }

        submit(&service, &mut session, &chat, input).await;
    }

    Ok(())
}

async fn submit(service: &ChatService, session: &mut Session, chat: &ChatSettings, input: &str) {
    let spinner = Output::spinner("Thinking...");
    let result = service
        .submit(session, chat, input, |item| spinner.suspend(|| Output::rendered(item)))
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(Some(outcome)) => debug!("Turn rendered {} item(s)", outcome.rendered.len()),
        Ok(None) => {}
        Err(e) => Output::error(&format!("Error: {}", e)),
    }
    println!();
}

async fn handle_command(
    command: &str,
    service: &ChatService,
    session: &mut Session,
    chat: &mut ChatSettings,
) -> Result<()> {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "help" => print_help(),
        "model" if arg.is_empty() => {
            for choice in ModelChoice::ALL {
                Output::list_item(choice.display_name());
            }
        }
        "model" => {
            switch_model(chat, arg)?;
            Output::success(&format!("Using {}", chat.llm));
        }
        "search" => {
            let enabled = parse_toggle(arg, chat.search_web)?;
            if enabled {
                preflight::check(Operation::Search)?;
            }
            chat.search_web = enabled;
            Output::success(&format!("Web search {}", on_off(chat.search_web)));
        }
        "rewrite" => {
            chat.prompt_engineer = parse_toggle(arg, chat.prompt_engineer)?;
            Output::success(&format!("Prompt engineer {}", on_off(chat.prompt_engineer)));
        }
        "voice" => {
            if arg.is_empty() {
                anyhow::bail!("Usage: /voice <path to audio file>");
            }
            let clip = AudioClip::from_path(Path::new(arg)).await?;
            let spinner = Output::spinner("Transcribing...");
            let transcript = service.transcribe(&clip).await;
            spinner.finish_and_clear();
            let transcript = transcript?;
            println!("{} {}", style("You (voice):").green().bold(), transcript);
            submit(service, session, chat, &transcript).await;
        }
        "history" => {
            if session.history.is_empty() {
                Output::info("No messages yet.");
            }
            for message in &session.history {
                Output::turn(message);
            }
        }
        "settings" => {
            Output::kv("Session", &session.id);
            print_settings(chat);
        }
        "clear" => {
            service.reset(session).await?;
            Output::info("Conversation cleared.");
        }
        other => anyhow::bail!("Unknown command: /{} (try /help)", other),
    }
    Ok(())
}

/// Switch the LLM only if it is known and its key is set.
fn switch_model(chat: &mut ChatSettings, name: &str) -> crate::error::Result<()> {
    let choice: ModelChoice = name.parse()?;
    preflight::check(Operation::Chat(choice.provider()))?;
    chat.llm = choice.display_name().to_string();
    Ok(())
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "" => Ok(!current),
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => anyhow::bail!("Expected on or off, got '{}'", other),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn print_settings(chat: &ChatSettings) {
    Output::kv("LLM", &chat.llm);
    Output::kv("Web search", on_off(chat.search_web));
    Output::kv("Prompt engineer", on_off(chat.prompt_engineer));
}

fn print_help() {
    Output::header("Commands");
    Output::list_item("/model [name]     list models or switch the LLM");
    Output::list_item("/search [on|off]  toggle web search");
    Output::list_item("/rewrite [on|off] toggle the prompt engineer");
    Output::list_item("/voice <file>     transcribe a clip and send it");
    Output::list_item("/history          show this session's messages");
    Output::list_item("/settings         show the current choices");
    Output::list_item("/clear            forget this conversation");
    Output::list_item("exit              quit");
}

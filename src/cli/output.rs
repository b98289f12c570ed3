//! CLI output formatting utilities.

use crate::chat::Rendered;
use crate::message::{Message, Role};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one rendered chat item.
    pub fn rendered(item: &Rendered) {
        match item {
            Rendered::Text { text } => {
                println!("\n{} {}", style("Cora:").magenta().bold(), text);
            }
            Rendered::ToolCalled { name, payload } => {
                println!("  {} {}", style("Tool Called:").yellow(), style(name).bold());
                println!("{}", style(indent(&pretty(payload), 4)).dim());
            }
            Rendered::ToolResponse { name, payload } => {
                let label = name.as_deref().unwrap_or("tool");
                println!("  {} {}", style("Tool Response:").yellow(), style(label).bold());
                println!("{}", style(indent(&content_preview(&pretty(payload), 600), 4)).dim());
            }
            Rendered::Rewritten { text } => {
                println!("  {} {}", style("Rewritten:").cyan(), style(text).italic());
            }
        }
    }

    /// Print a history entry.
    pub fn turn(message: &Message) {
        let who = match message.role {
            Role::Human => style("You:").green().bold(),
            Role::Assistant => style("Cora:").magenta().bold(),
            Role::Tool => style("Tool:").yellow().bold(),
        };
        println!("{} {}", who, message.text());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

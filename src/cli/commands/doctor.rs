//! Doctor command - verify API keys and configuration.

use crate::cli::preflight::{is_key_set, provider_key_var};
use crate::cli::Output;
use crate::config::{MemoryProvider, Settings};
use crate::llm::{ModelChoice, Provider};
use console::style;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Pass,
    Warn,
    Fail,
}

/// Outcome of one diagnostic.
#[derive(Debug)]
struct Finding {
    label: String,
    status: Status,
    detail: String,
    fix: Option<String>,
}

impl Finding {
    fn pass(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            status: Status::Pass,
            detail: detail.into(),
            fix: None,
        }
    }

    fn flag(status: Status, label: &str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            status,
            detail: detail.into(),
            fix: Some(fix.into()),
        }
    }
}

/// Findings grouped under printed section titles.
#[derive(Default)]
struct Report {
    findings: Vec<Finding>,
}

impl Report {
    fn section(&mut self, title: &str, findings: Vec<Finding>) {
        println!("{}", style(title).bold());
        for finding in &findings {
            let mark = match finding.status {
                Status::Pass => style("✓").green(),
                Status::Warn => style("!").yellow(),
                Status::Fail => style("✗").red(),
            };
            println!("  {} {} - {}", mark, style(&finding.label).bold(), finding.detail);
            if let Some(fix) = &finding.fix {
                println!("    {} {}", style("→").dim(), style(fix).dim());
            }
        }
        println!();
        self.findings.extend(findings);
    }

    fn count(&self, status: Status) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("Cora Doctor");
    println!();

    let mut report = Report::default();

    report.section(
        "Model Providers",
        [Provider::OpenAI, Provider::Anthropic, Provider::Groq]
            .into_iter()
            .map(|provider| {
                let purpose = format!("used by {}", provider_models(provider));
                key_finding(provider_key_var(provider), &purpose)
            })
            .collect(),
    );

    report.section(
        "Features",
        vec![
            key_finding("TAVILY_API_KEY", "used by web search"),
            default_llm_finding(settings),
        ],
    );

    report.section("Storage", storage_findings(settings));

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    let config = if config_path.exists() {
        Finding::pass("Config file", config_path.display().to_string())
    } else {
        Finding::flag(Status::Warn, "Config file", "using defaults", "Create with: cora config edit")
    };
    report.section("Configuration", vec![config]);

    match (report.count(Status::Fail), report.count(Status::Warn)) {
        (0, 0) => Output::success("All checks passed! Cora is ready to use."),
        (0, warnings) => Output::warning(&format!("All checks passed with {} warning(s).", warnings)),
        (errors, _) => {
            Output::error(&format!("{} error(s) found. Please fix them before using Cora.", errors));
            std::process::exit(1);
        }
    }

    Ok(())
}

fn provider_models(provider: Provider) -> String {
    ModelChoice::ALL
        .iter()
        .filter(|c| c.provider() == provider)
        .map(|c| c.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Missing keys only warn: a chat needs just the selected provider's key.
fn key_finding(var: &str, purpose: &str) -> Finding {
    let fix = format!("Set with: export {}='...' ({})", var, purpose);
    match std::env::var(var) {
        Ok(key) if key.chars().count() > 12 => Finding::pass(var, format!("configured ({})", mask_key(&key))),
        Ok(key) if key.is_empty() => Finding::flag(Status::Warn, var, "empty", fix),
        Ok(_) => Finding::flag(Status::Warn, var, "set but looks too short", fix),
        Err(_) => Finding::flag(Status::Warn, var, "not set", fix),
    }
}

/// Show the start and end of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}...{}", head, tail)
}

/// The configured default LLM must be selectable and have its key.
fn default_llm_finding(settings: &Settings) -> Finding {
    match settings.models.default_llm.parse::<ModelChoice>() {
        Ok(choice) if is_key_set(provider_key_var(choice.provider())) => {
            Finding::pass("Default LLM", choice.display_name())
        }
        Ok(choice) => Finding::flag(
            Status::Fail,
            "Default LLM",
            format!("{} has no API key", choice.display_name()),
            format!("Set {} or change models.default_llm", provider_key_var(choice.provider())),
        ),
        Err(e) => Finding::flag(
            Status::Fail,
            "Default LLM",
            e.to_string(),
            "Run 'cora models' to see the valid names",
        ),
    }
}

fn storage_findings(settings: &Settings) -> Vec<Finding> {
    let data_dir = settings.data_dir();
    let mut findings = vec![if data_dir.exists() {
        Finding::pass("Data directory", data_dir.display().to_string())
    } else {
        Finding::flag(
            Status::Warn,
            "Data directory",
            format!("{} (missing)", data_dir.display()),
            "Created on the next run",
        )
    }];

    if settings.memory.provider == MemoryProvider::Memory {
        findings.push(Finding::pass("Memory", "in-memory (conversations end with the process)"));
        return findings;
    }

    let db_path = settings.sqlite_path();
    findings.push(match std::fs::metadata(&db_path) {
        Ok(meta) => Finding::pass(
            "Checkpoints",
            format!("{} ({})", db_path.display(), format_size(meta.len())),
        ),
        Err(_) => Finding::flag(
            Status::Warn,
            "Checkpoints",
            format!("{} (not created yet)", db_path.display()),
            "Created on the first chat",
        ),
    });
    findings
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    if unit == "B" {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, unit)
    }
}

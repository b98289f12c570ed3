//! Cora CLI entry point.

use anyhow::Result;
use clap::Parser;
use cora::cli::{commands, Cli, Commands};
use cora::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref().map(PathBuf::from);

    // Load configuration
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("cora={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Chat { args } => {
            commands::run_chat(args, settings).await?;
        }

        Commands::Ask { question, args } => {
            commands::run_ask(question, args, settings).await?;
        }

        Commands::Transcribe { file } => {
            commands::run_transcribe(file, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Models => {
            commands::run_models(&settings);
        }

        Commands::History { session } => {
            commands::run_history(session.as_deref(), settings).await?;
        }

        Commands::About => {
            commands::run_about(&settings);
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_deref())?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}

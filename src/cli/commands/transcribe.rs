//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcription::{AudioClip, Transcriber, WhisperTranscriber};
use anyhow::Result;
use std::path::Path;

/// Run the transcribe command.
pub async fn run_transcribe(file: &Path, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe) {
        Output::error(&e.to_string());
        Output::info("Run 'cora doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let clip = AudioClip::from_path(file).await?;
    let transcriber = WhisperTranscriber::from_settings(&settings.transcription)?;

    let spinner = Output::spinner(&format!("Transcribing {}...", clip.file_name));
    let result = transcriber.transcribe(&clip).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Transcription failed: {}", e));
            Err(e.into())
        }
    }
}

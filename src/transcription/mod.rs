//! Voice input: speech-to-text for recorded clips.
//!
//! Transcripts are submitted to the chat exactly like typed text.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::{CoraError, Result};
use async_trait::async_trait;
use std::path::Path;

/// A recorded audio clip.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// File name, used by the service to infer the audio format.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a clip from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a clip to plain text.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;
}

/// Reject clips the service cannot accept.
pub(crate) fn validate_clip(clip: &AudioClip) -> Result<()> {
    if clip.is_empty() {
        return Err(CoraError::InvalidInput("Audio clip is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clip_from_path_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.m4a");
        std::fs::write(&path, b"RIFF").unwrap();

        let clip = AudioClip::from_path(&path).await.unwrap();
        assert_eq!(clip.file_name, "note.m4a");
        assert_eq!(clip.bytes, b"RIFF");
    }

    #[test]
    fn test_empty_clip_rejected() {
        let clip = AudioClip::new("empty.wav", Vec::new());
        assert!(matches!(validate_clip(&clip), Err(CoraError::InvalidInput(_))));
    }
}

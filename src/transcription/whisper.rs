//! OpenAI Whisper transcription implementation.

use super::{validate_clip, AudioClip, Transcriber};
use crate::config::TranscriptionSettings;
use crate::error::{CoraError, Result};
use crate::openai::create_client;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("whisper-1", None)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, language: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            language: language.map(str::to_string),
        })
    }

    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        Self::with_config(&settings.model, settings.language.as_deref())
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self, clip), fields(file = %clip.file_name, bytes = clip.bytes.len()))]
    async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        validate_clip(clip)?;
        debug!("Transcribing audio clip");

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(clip.file_name.clone(), clip.bytes.clone()))
            .model(&self.model);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| CoraError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| CoraError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

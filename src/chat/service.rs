//! Turn handling: input → (optional rewrite) → agent stream → rendered items.

use super::projection::{project_event, Rendered};
use super::session::Session;
use crate::agent::{AgentFactory, ChatSettings, HostedAgentFactory, RunConfig};
use crate::config::{Prompts, Settings};
use crate::error::{CoraError, Result};
use crate::memory::create_checkpointer;
use crate::message::Message;
use crate::prompt_engineer::PromptEngineer;
use crate::transcription::{AudioClip, Transcriber, WhisperTranscriber};
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of one submitted turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Input as sent to the agent, when the prompt engineer rewrote it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten: Option<String>,
    /// Everything shown for this turn, in order.
    pub rendered: Vec<Rendered>,
    /// Assistant messages appended to the session history.
    pub appended: usize,
}

/// Drives chat turns for any front end.
pub struct ChatService {
    agents: Arc<dyn AgentFactory>,
    prompt_engineer: Option<Arc<PromptEngineer>>,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl ChatService {
    pub fn new(agents: Arc<dyn AgentFactory>) -> Self {
        Self {
            agents,
            prompt_engineer: None,
            transcriber: None,
        }
    }

    pub fn with_prompt_engineer(mut self, engineer: PromptEngineer) -> Self {
        self.prompt_engineer = Some(Arc::new(engineer));
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Wire the hosted providers, the configured memory and Whisper.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::from_settings(settings)?;
        let checkpointer = create_checkpointer(settings)?;
        let agents = HostedAgentFactory::new(settings.clone(), prompts.clone(), checkpointer);

        let mut service = Self::new(Arc::new(agents));

        match PromptEngineer::from_settings(settings, prompts) {
            Ok(engineer) => service = service.with_prompt_engineer(engineer),
            Err(e) => warn!("Prompt engineer unavailable: {}", e),
        }
        match WhisperTranscriber::from_settings(&settings.transcription) {
            Ok(whisper) => service = service.with_transcriber(Arc::new(whisper)),
            Err(e) => warn!("Transcription unavailable: {}", e),
        }

        Ok(service)
    }

    pub fn agents(&self) -> &Arc<dyn AgentFactory> {
        &self.agents
    }

    /// Submit one user turn.
    ///
    /// Returns `Ok(None)` for blank input. Every rendered item is passed to
    /// `on_render` as soon as it is produced, then collected in the outcome.
    #[instrument(skip(self, session, chat, input, on_render), fields(session = %session.id, llm = %chat.llm))]
    pub async fn submit<F>(
        &self,
        session: &mut Session,
        chat: &ChatSettings,
        input: &str,
        mut on_render: F,
    ) -> Result<Option<TurnOutcome>>
    where
        F: FnMut(&Rendered),
    {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        // Unknown models fail here, before the turn is recorded.
        let agent = self.agents.build(chat)?;

        let mut rendered = Vec::new();
        let rewritten = if chat.prompt_engineer {
            let engineer = self
                .prompt_engineer
                .as_ref()
                .ok_or_else(|| CoraError::Config("Prompt engineer is not configured".to_string()))?;
            let text = engineer.rewrite(input).await?;
            let item = Rendered::Rewritten { text: text.clone() };
            on_render(&item);
            rendered.push(item);
            Some(text)
        } else {
            None
        };

        session.history.push(Message::human(input));
        let agent_input = match &rewritten {
            Some(text) => Message::human(text.as_str()).with_display(input),
            None => Message::human(input),
        };

        let before = session.history.len();
        let config = RunConfig::new(&session.id);
        let mut events = agent.stream(vec![agent_input], &config);
        while let Some(event) = events.try_next().await? {
            for item in project_event(&event, &mut session.history) {
                on_render(&item);
                rendered.push(item);
            }
        }

        let appended = session.history.len() - before;
        info!("Turn complete: {} item(s), {} appended", rendered.len(), appended);

        Ok(Some(TurnOutcome {
            rewritten,
            rendered,
            appended,
        }))
    }

    /// Transcribe a clip and submit the transcript as a typed turn.
    pub async fn submit_voice<F>(
        &self,
        session: &mut Session,
        chat: &ChatSettings,
        clip: &AudioClip,
        on_render: F,
    ) -> Result<(String, Option<TurnOutcome>)>
    where
        F: FnMut(&Rendered),
    {
        let transcript = self.transcribe(clip).await?;
        debug!("Transcript: {}", transcript);
        let outcome = self.submit(session, chat, &transcript, on_render).await?;
        Ok((transcript, outcome))
    }

    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| CoraError::Config("Transcription is not configured".to_string()))?;
        transcriber.transcribe(clip).await
    }

    /// Forget a session's memory and clear its history.
    pub async fn reset(&self, session: &mut Session) -> Result<()> {
        self.agents.checkpointer().delete(&session.id).await?;
        session.history.clear();
        Ok(())
    }
}

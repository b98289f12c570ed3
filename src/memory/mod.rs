//! Conversation memory checkpoints.
//!
//! A checkpoint is the durable record of a thread's messages as the agent
//! sees them. Agents are rebuilt for every request; the checkpointer they are
//! handed is what carries a conversation from one request to the next.

mod saver;
mod sqlite;

pub use saver::MemorySaver;
pub use sqlite::SqliteSaver;

use crate::config::{MemoryProvider, Settings};
use crate::error::Result;
use crate::message::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Saved state of one conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub messages: Vec<Message>,
    /// Number of agent steps recorded so far.
    pub step: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            messages: Vec::new(),
            step: 0,
            updated_at: Utc::now(),
        }
    }

    /// Replace the messages and advance the step counter.
    pub fn advance(&mut self, messages: &[Message]) {
        self.messages = messages.to_vec();
        self.step += 1;
        self.updated_at = Utc::now();
    }
}

/// Summary of a stored thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub thread_id: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Trait for checkpoint store implementations.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Latest checkpoint for a thread, if any.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Store a checkpoint, replacing the previous one for its thread.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget a thread. Returns whether it existed.
    async fn delete(&self, thread_id: &str) -> Result<bool>;

    /// List stored threads, most recently updated first.
    async fn list_threads(&self) -> Result<Vec<ThreadInfo>>;
}

/// Create the checkpointer selected in settings.
pub fn create_checkpointer(settings: &Settings) -> Result<Arc<dyn Checkpointer>> {
    match settings.memory.provider {
        MemoryProvider::Sqlite => Ok(Arc::new(SqliteSaver::new(&settings.sqlite_path())?)),
        MemoryProvider::Memory => Ok(Arc::new(MemorySaver::new())),
    }
}

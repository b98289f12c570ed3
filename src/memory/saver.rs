//! In-memory checkpointer.
//!
//! Useful for testing and for sessions that need not outlive the process.

use super::{Checkpoint, Checkpointer, ThreadInfo};
use crate::error::{CoraError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory checkpoint store.
pub struct MemorySaver {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> CoraError {
    CoraError::Checkpoint(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().map_err(poisoned)?;
        Ok(threads.get(thread_id).cloned())
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        threads.insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        Ok(threads.remove(thread_id).is_some())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadInfo>> {
        let threads = self.threads.read().map_err(poisoned)?;

        let mut infos: Vec<ThreadInfo> = threads
            .values()
            .map(|c| ThreadInfo {
                thread_id: c.thread_id.clone(),
                message_count: c.messages.len(),
                updated_at: c.updated_at,
            })
            .collect();
        infos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(infos)
    }
}

//! SQLite-based checkpointer.
//!
//! Messages are stored as a JSON array per thread, so sessions survive restarts.

use super::{Checkpoint, Checkpointer, ThreadInfo};
use crate::error::{CoraError, Result};
use crate::message::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS checkpoints (
        thread_id TEXT PRIMARY KEY,
        messages_json TEXT NOT NULL,
        message_count INTEGER NOT NULL,
        step INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_checkpoints_updated_at ON checkpoints(updated_at);
"#;

/// SQLite-backed checkpoint store.
pub struct SqliteSaver {
    conn: Mutex<Connection>,
}

impl SqliteSaver {
    /// Open (or create) a checkpoint database.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite checkpoint store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoraError::Checkpoint(format!("Failed to acquire lock: {}", e)))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoraError::Checkpoint(format!("Invalid timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    #[instrument(skip(self))]
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT messages_json, step, updated_at FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((messages_json, step, updated_at)) => {
                let messages: Vec<Message> = serde_json::from_str(&messages_json)?;
                Ok(Some(Checkpoint {
                    thread_id: thread_id.to_string(),
                    messages,
                    step: step as u64,
                    updated_at: parse_timestamp(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id))]
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let messages_json = serde_json::to_string(&checkpoint.messages)?;
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO checkpoints
            (thread_id, messages_json, message_count, step, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                checkpoint.thread_id,
                messages_json,
                checkpoint.messages.len() as i64,
                checkpoint.step as i64,
                checkpoint.updated_at.to_rfc3339(),
            ],
        )?;

        debug!("Stored checkpoint at step {}", checkpoint.step);
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM checkpoints WHERE thread_id = ?1",
            params![thread_id],
        )?;
        Ok(deleted > 0)
    }

    async fn list_threads(&self) -> Result<Vec<ThreadInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT thread_id, message_count, updated_at FROM checkpoints ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut threads = Vec::new();
        for row in rows {
            let (thread_id, message_count, updated_at) = row?;
            threads.push(ThreadInfo {
                thread_id,
                message_count: message_count as usize,
                updated_at: parse_timestamp(&updated_at)?,
            });
        }

        Ok(threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Chunk, Content};
    use serde_json::json;

    #[tokio::test]
    async fn test_sqlite_saver_roundtrip_preserves_chunks() {
        let saver = SqliteSaver::in_memory().unwrap();

        let mut checkpoint = Checkpoint::new("thread-a");
        checkpoint.advance(&[
            Message::human("weather?"),
            Message::assistant(Content::Chunks(vec![Chunk::ToolUse {
                id: "t1".to_string(),
                name: "search".to_string(),
                input: json!({"query": "weather"}),
            }])),
        ]);
        saver.put(&checkpoint).await.unwrap();

        let loaded = saver.get("thread-a").await.unwrap().unwrap();
        assert_eq!(loaded.messages, checkpoint.messages);
        assert_eq!(loaded.step, 1);
    }

    #[tokio::test]
    async fn test_sqlite_saver_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.db");

        {
            let saver = SqliteSaver::new(&path).unwrap();
            let mut checkpoint = Checkpoint::new("s1");
            checkpoint.advance(&[Message::human("remember me")]);
            saver.put(&checkpoint).await.unwrap();
        }

        let saver = SqliteSaver::new(&path).unwrap();
        let loaded = saver.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].text(), "remember me");

        let threads = saver.list_threads().await.unwrap();
        assert_eq!(threads.len(), 1);
        assert!(saver.delete("s1").await.unwrap());
        assert!(saver.get("s1").await.unwrap().is_none());
    }
}

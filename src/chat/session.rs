//! Chat sessions and the store that holds them for the HTTP API.

use crate::config::ServerSettings;
use crate::error::{CoraError, Result};
use crate::memory::Checkpointer;
use crate::message::{Content, Message, Role};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// A conversation with the agent.
///
/// The id keys the memory checkpoint and never changes for the session's lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Displayed turns: human input and assistant text.
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session with a fresh id.
    pub fn new() -> Self {
        Self::with_id(&Uuid::new_v4().to_string())
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Reopen a session, rebuilding its displayed history from the checkpoint.
    pub async fn restore(id: &str, checkpointer: &dyn Checkpointer) -> Result<Self> {
        let mut session = Self::with_id(id);
        if let Some(checkpoint) = checkpointer.get(id).await? {
            session.created_at = checkpoint.updated_at;
            session.history = display_history(&checkpoint.messages);
        }
        Ok(session)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Displayed turns from agent messages: human turns and non-empty assistant text.
pub fn display_history(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::Human => Some(Message::human(m.display_text())),
            Role::Assistant => {
                let text = m.text();
                (!text.is_empty()).then(|| Message::assistant(Content::Text(text)))
            }
            Role::Tool => None,
        })
        .collect()
}

/// Shared handle to one session; the lock serializes its turns.
pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_used: Instant,
    /// Recency order; larger is more recent.
    seq: u64,
}

#[derive(Default)]
struct Loaded {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl Loaded {
    fn touch(&mut self, id: &str) -> Option<SessionHandle> {
        self.clock += 1;
        let seq = self.clock;
        self.entries.get_mut(id).map(|entry| {
            entry.last_used = Instant::now();
            entry.seq = seq;
            entry.handle.clone()
        })
    }

    fn insert(&mut self, id: &str, handle: SessionHandle) {
        self.clock += 1;
        let entry = Entry {
            handle,
            last_used: Instant::now(),
            seq: self.clock,
        };
        self.entries.insert(id.to_string(), entry);
    }
}

/// Sessions held by a long-running server.
///
/// Loaded sessions are a cache over the checkpointer: idle ones are unloaded
/// and the least recently used go first once `max_sessions` is reached. A
/// session whose handle is still held by a request is never unloaded.
pub struct SessionStore {
    loaded: RwLock<Loaded>,
    idle: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default())
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle: Duration, max_sessions: usize) -> Self {
        Self {
            loaded: RwLock::new(Loaded::default()),
            idle,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::with_limits(Duration::from_secs(settings.session_idle_secs), settings.max_sessions)
    }

    /// Create and register a new session.
    pub async fn create(&self) -> (String, SessionHandle) {
        let session = Session::new();
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));

        let mut loaded = self.loaded.write().await;
        self.evict(&mut loaded);
        loaded.insert(&id, handle.clone());
        (id, handle)
    }

    /// Look up a session, falling back to its checkpoint if it is not loaded.
    pub async fn get_or_restore(&self, id: &str, checkpointer: &dyn Checkpointer) -> Result<SessionHandle> {
        if let Some(handle) = self.loaded.write().await.touch(id) {
            return Ok(handle);
        }

        if checkpointer.get(id).await?.is_none() {
            return Err(CoraError::SessionNotFound(id.to_string()));
        }

        let session = Session::restore(id, checkpointer).await?;
        let mut loaded = self.loaded.write().await;
        // Another request may have restored it meanwhile.
        if let Some(handle) = loaded.touch(id) {
            return Ok(handle);
        }
        self.evict(&mut loaded);
        let handle = Arc::new(Mutex::new(session));
        loaded.insert(id, handle.clone());
        Ok(handle)
    }

    /// Drop a session from the store. Returns whether it was loaded.
    pub async fn remove(&self, id: &str) -> bool {
        self.loaded.write().await.entries.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.loaded.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.loaded.read().await.entries.is_empty()
    }

    /// Make room for one more session.
    fn evict(&self, loaded: &mut Loaded) {
        let now = Instant::now();
        let before = loaded.entries.len();
        loaded.entries.retain(|_, entry| {
            in_use(entry) || now.duration_since(entry.last_used) < self.idle
        });

        while loaded.entries.len() >= self.max_sessions {
            let oldest = loaded
                .entries
                .iter()
                .filter(|(_, entry)| !in_use(entry))
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    loaded.entries.remove(&id);
                }
                None => {
                    warn!("All {} loaded sessions are busy; exceeding the limit", loaded.entries.len());
                    break;
                }
            }
        }

        let evicted = before - loaded.entries.len();
        if evicted > 0 {
            debug!("Unloaded {} session(s), {} remain", evicted, loaded.entries.len());
        }
    }
}

/// A handle cloned out to a request is still in use.
fn in_use(entry: &Entry) -> bool {
    Arc::strong_count(&entry.handle) > 1
}

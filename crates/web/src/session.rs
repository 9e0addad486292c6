//! Per-browser session state.
//!
//! A session owns the conversation engine built by its last successful Train
//! action and the chat history returned by its last question. Sessions are
//! keyed by a random id carried in a cookie and never shared.

use docu_core::{AppError, AppResult};
use docu_knowledge::{ChatMessage, ConversationEngine};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// State of one browser session.
#[derive(Debug, Default)]
pub struct Session {
    /// Engine from the last successful Train action
    pub engine: Option<ConversationEngine>,

    /// History returned by the last answered question
    pub chat_history: Option<Vec<ChatMessage>>,
}

impl Session {
    pub fn is_trained(&self) -> bool {
        self.engine.is_some()
    }

    /// Number of chunks in the trained index, if any.
    pub fn indexed_chunks(&self) -> Option<usize> {
        self.engine.as_ref().map(ConversationEngine::chunk_count)
    }

    /// Swap in a freshly trained engine. Its conversation starts empty.
    pub fn install(&mut self, engine: ConversationEngine) {
        self.engine = Some(engine);
        self.chat_history = None;
    }

    /// Ask the current engine and keep the returned history.
    ///
    /// Fails with [`AppError::NotTrained`] before the first Train action.
    pub async fn ask(&mut self, question: &str) -> AppResult<&[ChatMessage]> {
        let engine = self.engine.as_mut().ok_or(AppError::NotTrained)?;
        let history = engine.ask(question).await?;
        let history = self.chat_history.insert(history);
        Ok(history.as_slice())
    }
}

/// Shared handle to one session; requests within a session run one at a time.
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug)]
struct SessionEntry {
    handle: SessionHandle,
    last_access: Instant,
}

/// All live sessions.
///
/// Sessions idle for longer than the idle timeout are dropped, and once
/// `max_sessions` are live the least recently used one makes room for a new
/// one.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(1000, Duration::from_secs(3600))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    /// Look up a session, creating a new one when `id` is missing, unknown
    /// or expired.
    ///
    /// Unknown ids are not adopted; the returned id is the one to hand back
    /// to the client.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        self.drop_idle(&mut sessions, now);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_access = now;
                return (id, entry.handle.clone());
            }
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    tracing::debug!(session = %oldest, "Evicted least recently used session");
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        let handle = SessionHandle::default();
        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_access: now,
            },
        );
        tracing::debug!(session = %id, "Created session");
        (id, handle)
    }

    /// Forget a session entirely. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    /// Drop every session idle past the timeout, returning how many went.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        self.drop_idle(&mut sessions, Instant::now())
    }

    fn drop_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < self.idle_timeout);
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped idle sessions");
        }
        dropped
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

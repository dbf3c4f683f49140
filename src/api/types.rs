//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::pipeline::TriagePipeline;
use crate::session::TriageSession;

/// Sessions kept in memory before the oldest idle one is evicted.
pub const MAX_SESSIONS: usize = 1_000;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<TriagePipeline>,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(pipeline: TriagePipeline, config: AppConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
        }
    }

    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("session store lock poisoned".into()))
    }

    /// Check a session out for one turn: an existing one by id, or a new one.
    pub fn begin_turn(&self, id: Option<Uuid>) -> Result<SessionTurn, ApiError> {
        let session = {
            let mut store = self.lock_sessions()?;
            match id {
                Some(id) => store.checkout(id)?,
                None => store.checkout_new(),
            }
        };
        Ok(SessionTurn {
            sessions: self.sessions.clone(),
            session,
            finished: false,
        })
    }
}

/// A session checked out for one turn.
///
/// `finish` checks it back in. Dropped unfinished (the turn panicked), the
/// session is discarded so it does not stay busy.
pub struct SessionTurn {
    sessions: Arc<Mutex<SessionStore>>,
    session: TriageSession,
    finished: bool,
}

impl SessionTurn {
    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn session_mut(&mut self) -> &mut TriageSession {
        &mut self.session
    }

    pub fn finish(mut self) {
        self.finished = true;
        let session = std::mem::take(&mut self.session);
        lock_store(&self.sessions).checkin(session);
    }
}

impl Drop for SessionTurn {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(session = %self.session.id, "Turn ended without check-in; session discarded");
            lock_store(&self.sessions).discard(self.session.id);
        }
    }
}

// Check-in must not be skipped because another thread panicked.
fn lock_store(sessions: &Mutex<SessionStore>) -> MutexGuard<'_, SessionStore> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),
    #[error("Session {0} is already running a triage turn")]
    Busy(Uuid),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SessionError::Busy(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

enum SessionSlot {
    Idle(TriageSession),
    /// Checked out by a running turn.
    InTurn,
}

struct StoreEntry {
    /// Insertion order; the smallest idle one is evicted first.
    seq: u64,
    slot: SessionSlot,
}

/// In-memory session registry.
///
/// A turn checks its session out and back in, so two turns of the same
/// session never overlap and the lock is not held across model calls.
#[derive(Default)]
pub struct SessionStore {
    entries: HashMap<Uuid, StoreEntry>,
    next_seq: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a fresh session and return a snapshot of it.
    pub fn create(&mut self) -> TriageSession {
        let session = TriageSession::new();
        self.insert(session.id, SessionSlot::Idle(session.clone()));
        tracing::debug!(session = %session.id, total = self.entries.len(), "Session created");
        session
    }

    /// Start a new session that is checked out from the start.
    pub fn checkout_new(&mut self) -> TriageSession {
        let session = TriageSession::new();
        self.insert(session.id, SessionSlot::InTurn);
        session
    }

    pub fn snapshot(&self, id: Uuid) -> Result<TriageSession, SessionError> {
        match self.entries.get(&id).map(|e| &e.slot) {
            Some(SessionSlot::Idle(session)) => Ok(session.clone()),
            Some(SessionSlot::InTurn) => Err(SessionError::Busy(id)),
            None => Err(SessionError::NotFound(id)),
        }
    }

    /// Take exclusive ownership of a session for one turn.
    pub fn checkout(&mut self, id: Uuid) -> Result<TriageSession, SessionError> {
        let entry = self.entries.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        match std::mem::replace(&mut entry.slot, SessionSlot::InTurn) {
            SessionSlot::Idle(session) => Ok(session),
            SessionSlot::InTurn => Err(SessionError::Busy(id)),
        }
    }

    pub fn checkin(&mut self, session: TriageSession) {
        match self.entries.get_mut(&session.id) {
            Some(entry) => entry.slot = SessionSlot::Idle(session),
            // Evicted or discarded mid-turn; keep the result anyway.
            None => self.insert(session.id, SessionSlot::Idle(session)),
        }
    }

    /// Forget a session whose turn died.
    pub fn discard(&mut self, id: Uuid) {
        self.entries.remove(&id);
    }

    fn insert(&mut self, id: Uuid, slot: SessionSlot) {
        if self.entries.len() >= MAX_SESSIONS {
            self.evict_oldest();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, StoreEntry { seq, slot });
    }

    /// Evict the oldest idle session, or the oldest busy one when none is
    /// idle. A busy session evicted mid-turn is re-added by `checkin`.
    fn evict_oldest(&mut self) {
        if let Some(id) = self.oldest(true) {
            self.entries.remove(&id);
            tracing::debug!(session = %id, "Evicted oldest idle session");
        } else if let Some(id) = self.oldest(false) {
            self.entries.remove(&id);
            tracing::warn!(session = %id, "No idle session to evict; evicted oldest busy session");
        }
    }

    fn oldest(&self, idle: bool) -> Option<Uuid> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e.slot, SessionSlot::Idle(_)) == idle)
            .min_by_key(|(_, e)| e.seq)
            .map(|(id, _)| *id)
    }
}

//! Lock-guarded in-memory session store with TTL eviction.

use chrono::Duration;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use vcomp_models::{Session, SessionId};

/// In-memory session store.
///
/// Injected into the engine rather than living in a process-wide global.
/// All mutation goes through the single lock; eviction deletes the evicted
/// session's temp files before the lock is released, so no concurrent
/// reader can observe a session whose files are half-gone.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert a new session, returning its ID.
    pub async fn insert(&self, session: Session) -> SessionId {
        let id = session.id.clone();
        self.sessions.lock().await.insert(id.clone(), session);
        id
    }

    /// Clone of the session, when present.
    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Run `f` against the session under the store lock.
    pub async fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> EngineResult<R> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))?;
        Ok(f(session))
    }

    /// Remove a session and delete its owned temp files.
    pub async fn remove(&self, id: &SessionId) -> EngineResult<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .remove(id)
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))?;
        delete_owned_files(&session).await;
        debug!(session_id = %id, "Session removed");
        Ok(())
    }

    /// Evict sessions older than the retention window. Runs before new work
    /// is accepted.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(self.ttl))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                delete_owned_files(&session).await;
            }
        }

        if !expired.is_empty() {
            info!(evicted = expired.len(), "Swept expired sessions");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

async fn delete_owned_files(session: &Session) {
    for file in session.owned_files() {
        match tokio::fs::remove_file(&file).await {
            Ok(()) => debug!(path = %file.display(), "Deleted session file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %file.display(), error = %e, "Could not delete session file"),
        }
    }
}

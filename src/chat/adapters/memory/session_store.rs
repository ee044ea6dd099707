//! In-memory implementation of the `SessionStore` port.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::chat::{
    domain::{Session, SessionId},
    ports::{SessionStore, StorageError, StorageResult},
};

/// In-memory implementation of [`SessionStore`].
///
/// Thread-safe via internal [`RwLock`]. Contents are lost on restart.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    ///
    /// A poisoned lock is read through rather than reported as empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(err: impl ToString) -> StorageError {
    StorageError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> StorageResult<Option<Session>> {
        let guard = self.sessions.read().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn persist(&self, session: &Session) -> StorageResult<()> {
        let mut guard = self.sessions.write().map_err(poisoned)?;
        guard.insert(session.session_id().clone(), session.clone());
        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        let mut guard = self.sessions.write().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|_, session| session.last_activity() >= cutoff);
        Ok(before - guard.len())
    }
}

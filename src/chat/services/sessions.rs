//! Session Store operations over the persistence port.

use crate::chat::{
    domain::{Role, Session, SessionId},
    ports::{SessionStore, StorageResult},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Resolves, mutates and persists chat sessions.
///
/// New sessions live only in memory until the first [`Self::persist`].
pub struct SessionService<S, C>
where
    S: SessionStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for SessionService<S, C>
where
    S: SessionStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> SessionService<S, C>
where
    S: SessionStore,
    C: Clock + Send + Sync,
{
    /// Creates a session service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Returns the clock used for timestamps and minted identifiers.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Finds a stored session.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the lookup fails.
    pub async fn get(&self, session_id: &SessionId) -> StorageResult<Option<Session>> {
        self.store.get(session_id).await
    }

    /// Returns the stored session for `session_id`, or a new empty one.
    ///
    /// When `session_id` is `None` a fresh identifier is minted. A supplied
    /// identifier that is not yet stored is adopted for the new session.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the lookup fails.
    pub async fn create_or_get(&self, session_id: Option<SessionId>) -> StorageResult<Session> {
        let Some(session_id) = session_id else {
            let minted = SessionId::mint(&*self.clock);
            debug!(session_id = %minted, "minted new chat session");
            return Ok(Session::new(minted, &*self.clock));
        };

        match self.store.get(&session_id).await? {
            Some(existing) => Ok(existing),
            None => {
                debug!(session_id = %session_id, "creating chat session for supplied id");
                Ok(Session::new(session_id, &*self.clock))
            }
        }
    }

    /// Appends a turn stamped with the current time.
    pub fn append(&self, session: &mut Session, role: Role, content: impl Into<String>) {
        session.append(role, content, &*self.clock);
    }

    /// Durably saves `session`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the write fails.
    pub async fn persist(&self, session: &Session) -> StorageResult<()> {
        self.store.persist(session).await
    }

    /// Removes sessions idle for longer than `ttl`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the purge fails.
    pub async fn purge_idle(&self, ttl: Duration) -> StorageResult<usize> {
        let max_idle = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = self
            .clock
            .utc()
            .checked_sub_signed(max_idle)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        self.store.purge_idle(cutoff).await
    }
}

//! Per-session mutual exclusion.

use crate::chat::domain::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Prune dead entries once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 128;

/// Hands out one async lock per session identifier.
///
/// Holding the guard serialises the read-modify-write cycle of a session.
/// Guards for different identifiers never contend. Entries are held weakly
/// and dropped once no request is using them.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Weak<AsyncMutex<()>>>>,
}

impl SessionLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        self.lock_for(session_id).lock_owned().await
    }

    /// Returns the number of identifiers with a live lock.
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn lock_for(&self, session_id: &SessionId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if locks.len() > PRUNE_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
            return existing;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(session_id.clone(), Arc::downgrade(&lock));
        lock
    }
}

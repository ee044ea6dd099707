//! Port for chat session persistence.

use crate::chat::domain::{Session, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for session store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Session persistence contract.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - Session IDs are unique across the entire store
/// - `persist` replaces the stored state of a session wholesale
/// - Concurrent access is handled safely
///
/// Read-modify-write ordering for a single session is the caller's
/// responsibility; see [`crate::chat::services::SessionLocks`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retrieves a session by identifier.
    ///
    /// Returns `None` if the session does not exist.
    async fn get(&self, id: &SessionId) -> StorageResult<Option<Session>>;

    /// Durably saves the full session state, inserting it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Persistence`] when the backend rejects the
    /// write.
    async fn persist(&self, session: &Session) -> StorageResult<()>;

    /// Removes sessions whose last activity is strictly before `cutoff`.
    ///
    /// Returns the number of sessions removed.
    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StorageResult<usize>;
}

/// Errors returned by session store implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps a data-quality or deserialization error from persisted rows.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

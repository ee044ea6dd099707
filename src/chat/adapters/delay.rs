//! Backoff sleeping adapters.

use crate::chat::ports::Delay;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Sleeps on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
///
/// Suitable for tests that assert on backoff without waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    /// Creates a recorder with no requested delays.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every delay requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<Duration> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

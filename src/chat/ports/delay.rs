//! Port for waiting between retry attempts.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the current task for a backoff interval.
///
/// Injected into the retry loop so tests can observe the requested delays
/// without sleeping.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

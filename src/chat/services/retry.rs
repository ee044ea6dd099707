//! Bounded exponential-backoff loop around single completion attempts.

use crate::chat::ports::{AttemptError, CompletionClient, Delay, GenerationConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Reply used when the service succeeds without usable text.
pub const EMPTY_COMPLETION_REPLY: &str =
    "Thanks for your message! How can I assist you today?";

/// Retry bound and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. A bound of zero is raised to one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Returns the total number of attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the wait after failed attempt number `attempt` (1-based).
    ///
    /// The base delay doubles with each attempt and saturates rather than
    /// overflowing.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Failure of the external completion after the retry loop gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    /// Every allowed attempt failed with a transient error.
    #[error("completion failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The final attempt's failure.
        last: AttemptError,
    },

    /// A non-retryable failure ended the loop early.
    #[error("completion rejected on attempt {attempt}: {cause}")]
    Rejected {
        /// Attempt on which the rejection occurred.
        attempt: u32,
        /// The rejection.
        cause: AttemptError,
    },
}

impl ExternalError {
    /// Returns the underlying failure of the last attempt.
    #[must_use]
    pub const fn last_cause(&self) -> &AttemptError {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Rejected { cause, .. } => cause,
        }
    }

    /// Returns how many attempts were made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Rejected { attempt, .. } => *attempt,
        }
    }
}

/// External Completion Client with retry, backoff and a per-attempt deadline.
///
/// Each attempt is bounded by [`GenerationConfig::timeout`]. Transient
/// failures are retried up to [`RetryPolicy::max_attempts`] with the waits
/// given by [`RetryPolicy::backoff_after`]; quota and auth failures end the
/// loop immediately.
pub struct RetryingCompletion<C, D>
where
    C: CompletionClient,
    D: Delay,
{
    client: Arc<C>,
    delay: Arc<D>,
    policy: RetryPolicy,
}

impl<C, D> Clone for RetryingCompletion<C, D>
where
    C: CompletionClient,
    D: Delay,
{
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            delay: Arc::clone(&self.delay),
            policy: self.policy,
        }
    }
}

impl<C, D> RetryingCompletion<C, D>
where
    C: CompletionClient,
    D: Delay,
{
    /// Creates a retrying wrapper around `client`.
    #[must_use]
    pub const fn new(client: Arc<C>, delay: Arc<D>, policy: RetryPolicy) -> Self {
        Self {
            client,
            delay,
            policy,
        }
    }

    /// Returns the retry policy in force.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Produces reply text for `prompt`.
    ///
    /// A successful attempt without usable text yields
    /// [`EMPTY_COMPLETION_REPLY`].
    ///
    /// # Errors
    ///
    /// Returns [`ExternalError::Rejected`] on a quota or auth failure and
    /// [`ExternalError::Exhausted`] once the attempt bound is reached.
    pub async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ExternalError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let failure = match self.attempt_once(prompt, config).await {
                Ok(text) => {
                    debug!(attempt, "completion succeeded");
                    return Ok(text
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_owned()));
                }
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                warn!(attempt, error = %failure, "completion rejected without retry");
                return Err(ExternalError::Rejected {
                    attempt,
                    cause: failure,
                });
            }

            if attempt >= max_attempts {
                warn!(attempt, error = %failure, "completion attempts exhausted");
                return Err(ExternalError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let wait = self.policy.backoff_after(attempt);
            warn!(
                attempt,
                delay_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "completion attempt failed; backing off"
            );
            self.delay.sleep(wait).await;
            attempt += 1;
        }
    }

    async fn attempt_once(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Option<String>, AttemptError> {
        tokio::time::timeout(config.timeout, self.client.attempt(prompt, config))
            .await
            .unwrap_or(Err(AttemptError::Timeout(config.timeout)))
    }
}

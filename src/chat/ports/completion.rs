//! Port for the external text-generation service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Sampling and deadline settings sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Top-k sampling cut-off.
    pub top_k: u32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// Hard deadline for a single attempt.
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 300,
            timeout: Duration::from_millis(10_000),
        }
    }
}

/// A single network call to the generation endpoint.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy lives in [`crate::chat::services::RetryingCompletion`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends `prompt` and returns the first candidate's text.
    ///
    /// `Ok(None)` means the service answered successfully but the payload
    /// carried no usable text.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError`] when the request fails or the service answers
    /// with a non-success status.
    async fn attempt(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Option<String>, AttemptError>;
}

/// How a failed attempt should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying after a backoff.
    Transient,
    /// Usage quota exhausted; surfaces immediately.
    Quota,
    /// Credential rejected; surfaces immediately.
    Auth,
}

/// Failure of a single generation attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// The attempt exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be delivered or the response not read.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a retryable non-success status.
    #[error("service returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the service.
        message: String,
    },

    /// The service reported exhausted quota.
    #[error("quota exhausted: {0}")]
    Quota(String),

    /// The service rejected the credential.
    #[error("credential rejected with status {status}: {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the service.
        message: String,
    },
}

impl AttemptError {
    /// Classifies the failure for retry purposes.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Timeout(_) | Self::Network(_) | Self::Status { .. } => FailureClass::Transient,
            Self::Quota(_) => FailureClass::Quota,
            Self::Auth { .. } => FailureClass::Auth,
        }
    }

    /// Returns `true` if another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), FailureClass::Transient)
    }
}

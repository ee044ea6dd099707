//! Error types for chat domain validation and parsing.

use thiserror::Error;

/// Rejection of an inbound chat message.
///
/// This is the only failure class that is reported to the caller as an
/// unsuccessful response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The request did not carry a message at all.
    #[error("Valid message is required")]
    MissingMessage,

    /// The message was empty or whitespace only.
    #[error("Valid message is required")]
    EmptyMessage,
}

/// Errors returned while constructing chat domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatDomainError {
    /// The session identifier is empty after trimming.
    #[error("session identifier must not be empty")]
    EmptySessionId,

    /// The session identifier exceeds the storage column width.
    #[error("session identifier exceeds {max} characters: {actual}")]
    SessionIdTooLong {
        /// Maximum accepted length.
        max: usize,
        /// Length of the rejected value.
        actual: usize,
    },
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid chat role: '{0}'")]
pub struct ParseRoleError(pub String);

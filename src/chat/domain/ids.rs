//! Session identifier newtype.

use super::ChatDomainError;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for a session identifier, matching the `VARCHAR(128)` column.
const MAX_SESSION_ID_LENGTH: usize = 128;

/// Opaque, caller-visible identifier for a chat session.
///
/// Callers may supply their own identifier; when they do not, one is minted
/// from the current time and a random suffix.
///
/// # Examples
///
/// ```
/// use parley::chat::domain::SessionId;
/// use mockable::DefaultClock;
///
/// let minted = SessionId::mint(&DefaultClock);
/// assert!(minted.as_str().starts_with("chat_"));
///
/// let supplied = SessionId::new("abc").expect("valid id");
/// assert_eq!(supplied.as_str(), "abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session identifier from caller input.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatDomainError::EmptySessionId`] when the value is empty
    /// after trimming, or [`ChatDomainError::SessionIdTooLong`] when it
    /// exceeds 128 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ChatDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ChatDomainError::EmptySessionId);
        }

        let actual = trimmed.chars().count();
        if actual > MAX_SESSION_ID_LENGTH {
            return Err(ChatDomainError::SessionIdTooLong {
                max: MAX_SESSION_ID_LENGTH,
                actual,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Mints a fresh identifier for a new conversation.
    #[must_use]
    pub fn mint(clock: &impl Clock) -> Self {
        Self::with_prefix("chat", clock.utc())
    }

    /// Mints a fresh identifier for a reply produced after an internal fault.
    #[must_use]
    pub fn mint_fallback(clock: &impl Clock) -> Self {
        Self::with_prefix("fallback", clock.utc())
    }

    fn with_prefix(prefix: &str, now: DateTime<Utc>) -> Self {
        Self(format!(
            "{prefix}_{}_{}",
            now.timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

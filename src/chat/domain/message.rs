//! Validated inbound user message.

use super::ValidationError;
use std::fmt;

/// Non-empty text submitted by a user.
///
/// Construction is the validation step of the chat flow: a message that
/// fails here never touches a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage(String);

impl UserMessage {
    /// Validates raw request input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingMessage`] when no message was sent,
    /// or [`ValidationError::EmptyMessage`] when it is empty or whitespace
    /// only.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let text = raw.ok_or(ValidationError::MissingMessage)?;
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(Self(text.to_owned()))
    }

    /// Returns the message text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

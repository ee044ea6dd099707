//! A single message within a session.

use super::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message within a conversation.
///
/// Turns are append-only: once pushed onto a [`super::Session`] they are
/// never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn stamped with the given time.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Returns the speaker role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the message text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the turn was appended.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Renders the turn as a `"<Role>: <content>"` prompt line.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}

//! Chat session aggregate root.

use super::{Role, SessionId, Turn};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Fractional-second digits kept on session timestamps.
const TIMESTAMP_DIGITS: u16 = 6;

/// Conversation history for one visitor.
///
/// Invariants maintained by the methods on this type:
///
/// - turns are kept in append order and their timestamps strictly increase
/// - `created_at <= last_activity`
/// - `last_activity` equals the timestamp of the newest turn once any turn
///   exists
/// - every timestamp is held at microsecond precision, so the invariants
///   survive a round trip through `TIMESTAMPTZ` columns
///
/// # Examples
///
/// ```
/// use parley::chat::domain::{Role, Session, SessionId};
/// use mockable::DefaultClock;
///
/// let clock = DefaultClock;
/// let mut session = Session::new(SessionId::mint(&clock), &clock);
/// session.append(Role::User, "Hello", &clock);
/// assert_eq!(session.turn_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    session_id: SessionId,
    messages: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    /// Persisted session identifier.
    pub session_id: SessionId,
    /// Persisted turns in append order.
    pub messages: Vec<Turn>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest activity timestamp.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new(session_id: SessionId, clock: &impl Clock) -> Self {
        let now = clock.utc().trunc_subsecs(TIMESTAMP_DIGITS);
        Self {
            session_id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Reconstructs a session from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSession) -> Self {
        Self {
            session_id: data.session_id,
            messages: data.messages,
            created_at: data.created_at,
            last_activity: data.last_activity,
        }
    }

    /// Appends a turn and advances `last_activity`.
    ///
    /// A clock reading that does not move past the current `last_activity`
    /// (a coarse or stepped-back clock) is replaced by `last_activity` plus
    /// one microsecond.
    pub fn append(&mut self, role: Role, content: impl Into<String>, clock: &impl Clock) {
        let now = clock.utc().trunc_subsecs(TIMESTAMP_DIGITS);
        let timestamp = if now > self.last_activity {
            now
        } else {
            self.last_activity + TimeDelta::microseconds(1)
        };
        self.messages.push(Turn::new(role, content, timestamp));
        self.last_activity = timestamp;
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns all turns, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    /// Returns at most `window` of the newest turns, oldest first.
    #[must_use]
    pub fn recent(&self, window: usize) -> &[Turn] {
        let skip = self.messages.len().saturating_sub(window);
        self.messages.get(skip..).unwrap_or_default()
    }

    /// Returns the number of turns.
    #[must_use]
    pub const fn turn_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest activity timestamp.
    #[must_use]
    pub const fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }
}

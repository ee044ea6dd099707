//! Diesel row models for chat session persistence.

use super::schema::chat_sessions;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for chat session records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatSessionRow {
    /// Session identifier.
    pub id: String,
    /// Turns JSON payload.
    pub messages: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest activity timestamp.
    pub last_activity: DateTime<Utc>,
}

/// Insert model for chat session records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_sessions)]
pub struct NewChatSessionRow {
    /// Session identifier.
    pub id: String,
    /// Turns JSON payload.
    pub messages: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest activity timestamp.
    pub last_activity: DateTime<Utc>,
}

//! Diesel schema for chat session persistence.

diesel::table! {
    /// Chat session records.
    chat_sessions (id) {
        /// Caller-visible session identifier.
        #[max_length = 128]
        id -> Varchar,
        /// Turns in append order as a JSONB array.
        messages -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Latest activity timestamp.
        last_activity -> Timestamptz,
    }
}

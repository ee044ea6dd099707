//! Inbound port driven by the HTTP layer.

use crate::chat::{
    domain::Session,
    ports::StorageResult,
    services::{ChatRequest, ChatResponse},
};
use async_trait::async_trait;
use std::time::Duration;

/// Chat operations exposed to transports.
///
/// Erases the generic parameters of
/// [`crate::chat::services::ChatOrchestrator`] so a server can pick its
/// storage adapter at start-up.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Handles one inbound message. Never fails at the transport level.
    async fn reply(&self, request: ChatRequest) -> ChatResponse;

    /// Returns the stored history for `session_id`, if any.
    async fn history(&self, session_id: &str) -> StorageResult<Option<Session>>;

    /// Removes sessions idle for longer than `ttl`.
    async fn purge_idle(&self, ttl: Duration) -> StorageResult<usize>;

    /// Returns `true` when an external credential is configured.
    fn is_configured(&self) -> bool;
}

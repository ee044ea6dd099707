//! Composition root: wires adapters into a [`ChatPort`].

use crate::chat::{
    adapters::{
        delay::TokioDelay, gemini::GeminiCompletionClient, memory::InMemorySessionStore,
        postgres::PostgresSessionStore,
    },
    config::ChatConfig,
    ports::{ChatPort, SessionStore, StorageError, StorageResult},
    services::{
        ChatOrchestrator, ContextBuilder, FallbackReplies, RetryingCompletion, SessionService,
    },
};
use mockable::DefaultClock;
use std::sync::Arc;
use tracing::{info, warn};

/// Storage backend selected at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// `PostgreSQL` via Diesel.
    Postgres,
    /// Process-local map; contents are lost on restart.
    Memory,
}

impl StorageKind {
    /// Returns the label reported by the health endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Builds the chat service over `store`.
///
/// When `config` carries no credential the service answers every accepted
/// message with the contact reply.
#[must_use]
pub fn build_chat_service<S>(store: Arc<S>, config: &ChatConfig) -> Arc<dyn ChatPort>
where
    S: SessionStore + 'static,
{
    let sessions = SessionService::new(store, Arc::new(DefaultClock));
    let context = ContextBuilder::new(config.system_instructions.as_str(), config.context_window);
    let orchestrator: ChatOrchestrator<S, GeminiCompletionClient, TokioDelay, DefaultClock> =
        ChatOrchestrator::new(sessions, context, FallbackReplies::default());

    let Some(api_key) = config.api_key.as_deref() else {
        return Arc::new(orchestrator);
    };

    let client = GeminiCompletionClient::new(api_key)
        .with_model(config.model.as_str())
        .with_base_url(config.api_base_url.as_str());
    let retrying = RetryingCompletion::new(Arc::new(client), Arc::new(TokioDelay), config.retry);
    Arc::new(orchestrator.with_completion(retrying, config.generation.clone()))
}

/// Opens storage per `config` and builds the chat service over it.
///
/// A configured database that cannot be reached is logged and replaced by
/// in-memory storage so the service keeps answering.
pub async fn open_chat_service(config: &ChatConfig) -> (Arc<dyn ChatPort>, StorageKind) {
    if let Some(url) = config.database_url.as_deref() {
        match open_postgres(url).await {
            Ok(store) => {
                info!("using PostgreSQL session storage");
                return (
                    build_chat_service(Arc::new(store), config),
                    StorageKind::Postgres,
                );
            }
            Err(err) => {
                warn!(error = %err, "database unavailable; falling back to in-memory sessions");
            }
        }
    } else {
        info!("no DATABASE_URL configured; using in-memory sessions");
    }

    (
        build_chat_service(Arc::new(InMemorySessionStore::new()), config),
        StorageKind::Memory,
    )
}

async fn open_postgres(url: &str) -> StorageResult<PostgresSessionStore> {
    let owned = url.to_owned();
    let store = tokio::task::spawn_blocking(move || PostgresSessionStore::connect(&owned))
        .await
        .map_err(StorageError::persistence)??;
    store.ensure_schema().await?;
    Ok(store)
}

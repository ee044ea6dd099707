//! Shared fakes and builders for chat integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::DefaultClock;
use parley::chat::{
    adapters::{delay::RecordingDelay, memory::InMemorySessionStore},
    domain::{Session, SessionId},
    ports::{
        AttemptError, ChatPort, CompletionClient, GenerationConfig, SessionStore, StorageError,
        StorageResult,
    },
    services::{
        ChatOrchestrator, ContextBuilder, FallbackReplies, RetryPolicy, RetryingCompletion,
        SessionService,
    },
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// System instructions used by every test service.
pub const TEST_INSTRUCTIONS: &str = "You are a test assistant.";

/// Completion client replaying queued outcomes, then a steady reply.
///
/// An optional per-call latency lets tests overlap concurrent requests.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    queued: Mutex<VecDeque<Result<Option<String>, AttemptError>>>,
    steady: Option<String>,
    latency: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    /// Answers every attempt with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            steady: Some(reply.to_owned()),
            ..Self::default()
        }
    }

    /// Fails every attempt with a transient network error.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Replays `outcomes` before falling back to the steady behaviour.
    pub fn with_queue(
        mut self,
        outcomes: impl IntoIterator<Item = Result<Option<String>, AttemptError>>,
    ) -> Self {
        self.queued = Mutex::new(outcomes.into_iter().collect());
        self
    }

    /// Sleeps for `latency` inside every attempt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn attempt(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Option<String>, AttemptError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_owned());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| {
            self.steady
                .clone()
                .map(Some)
                .ok_or_else(|| AttemptError::Network("connection refused".to_owned()))
        })
    }
}

/// Session store whose reads or writes can be forced to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemorySessionStore,
    fail_get: bool,
    fail_persist: bool,
}

impl FlakyStore {
    /// Store whose lookups always fail.
    pub fn failing_reads() -> Self {
        Self {
            fail_get: true,
            ..Self::default()
        }
    }

    /// Store whose writes always fail.
    pub fn failing_writes() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get(&self, session_id: &SessionId) -> StorageResult<Option<Session>> {
        if self.fail_get {
            return Err(StorageError::persistence(std::io::Error::other(
                "database unreachable",
            )));
        }
        self.inner.get(session_id).await
    }

    async fn persist(&self, session: &Session) -> StorageResult<()> {
        if self.fail_persist {
            return Err(StorageError::persistence(std::io::Error::other(
                "database unreachable",
            )));
        }
        self.inner.persist(session).await
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        self.inner.purge_idle(cutoff).await
    }
}

/// Orchestrator type assembled by [`chat_service`].
pub type TestOrchestrator<S> =
    ChatOrchestrator<S, ScriptedCompletion, RecordingDelay, DefaultClock>;

/// Builds a chat service over `store`.
///
/// Passing `None` for `completion` simulates a missing credential. The
/// returned recorder captures every backoff the retry loop requests.
pub fn chat_service<S>(
    store: Arc<S>,
    completion: Option<Arc<ScriptedCompletion>>,
) -> (Arc<dyn ChatPort>, RecordingDelay)
where
    S: SessionStore + 'static,
{
    let delay = RecordingDelay::new();
    let orchestrator: TestOrchestrator<S> = ChatOrchestrator::new(
        SessionService::new(store, Arc::new(DefaultClock)),
        ContextBuilder::new(TEST_INSTRUCTIONS, 4),
        FallbackReplies::default(),
    );
    let Some(client) = completion else {
        return (Arc::new(orchestrator), delay);
    };
    let retrying = RetryingCompletion::new(
        client,
        Arc::new(delay.clone()),
        RetryPolicy::new(3, Duration::from_millis(1000)),
    );
    (
        Arc::new(orchestrator.with_completion(retrying, GenerationConfig::default())),
        delay,
    )
}

/// Builds a chat service over a fresh in-memory store.
pub fn memory_chat_service(
    completion: Option<Arc<ScriptedCompletion>>,
) -> (Arc<dyn ChatPort>, Arc<InMemorySessionStore>, RecordingDelay) {
    let store = Arc::new(InMemorySessionStore::new());
    let (service, delay) = chat_service(Arc::clone(&store), completion);
    (service, store, delay)
}

//! Per-message chat flow.

use super::{ContextBuilder, FallbackReplies, RetryingCompletion, SessionLocks, SessionService};
use crate::chat::{
    domain::{Role, Session, SessionId, UserMessage, ValidationError},
    ports::{
        ChatPort, CompletionClient, Delay, GenerationConfig, SessionStore, StorageError,
        StorageResult,
    },
};
use async_trait::async_trait;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Inbound chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// User text; required and non-empty.
    #[serde(default)]
    pub message: Option<String>,
    /// Existing or caller-chosen session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Creates a request for `message` without a session identifier.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            session_id: None,
        }
    }

    /// Attaches a session identifier.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// How a reply was produced. Internal only; never serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyOutcome {
    /// The external service produced the reply.
    #[default]
    Completed,
    /// No credential is configured; the contact reply was used.
    Unconfigured,
    /// The external call failed; a canned reply was used.
    ExternalFallback,
    /// An internal fault interrupted the request.
    Fault,
    /// The input failed validation.
    Rejected,
}

impl ReplyOutcome {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unconfigured => "unconfigured",
            Self::ExternalFallback => "external_fallback",
            Self::Fault => "fault",
            Self::Rejected => "rejected",
        }
    }
}

/// Outbound chat response.
///
/// `success` is `false` only for validation rejections, which carry
/// `message` instead of `reply` and `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Whether the request was accepted.
    pub success: bool,
    /// Reply text for accepted requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Session the reply belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Explanation for rejected requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// How the reply was produced.
    #[serde(skip)]
    pub outcome: ReplyOutcome,
    /// Whether the session state was saved.
    #[serde(skip)]
    pub persisted: bool,
}

impl ChatResponse {
    fn replied(reply: impl Into<String>, session_id: &SessionId, outcome: ReplyOutcome) -> Self {
        Self {
            success: true,
            reply: Some(reply.into()),
            session_id: Some(session_id.as_str().to_owned()),
            message: None,
            outcome,
            persisted: false,
        }
    }

    fn rejected(err: &ValidationError) -> Self {
        Self {
            success: false,
            reply: None,
            session_id: None,
            message: Some(err.to_string()),
            outcome: ReplyOutcome::Rejected,
            persisted: false,
        }
    }

    const fn with_persisted(mut self, persisted: bool) -> Self {
        self.persisted = persisted;
        self
    }
}

/// Internal failure that aborts a conversation step.
#[derive(Debug, Error)]
enum ChatFault {
    #[error("session lookup failed: {0}")]
    Storage(#[from] StorageError),
    #[error("chat task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Chat Orchestrator: validates, resolves the session, completes and persists.
///
/// Work for one session identifier is serialised through [`SessionLocks`];
/// work for different identifiers proceeds concurrently. Each accepted
/// message runs on its own task, so a caller that stops waiting does not
/// cancel the external call or the final persist.
pub struct ChatOrchestrator<S, C, D, K>
where
    S: SessionStore + 'static,
    C: CompletionClient + 'static,
    D: Delay + 'static,
    K: Clock + Send + Sync + 'static,
{
    sessions: SessionService<S, K>,
    completion: Option<RetryingCompletion<C, D>>,
    generation: Arc<GenerationConfig>,
    context: Arc<ContextBuilder>,
    fallbacks: Arc<FallbackReplies>,
    locks: Arc<SessionLocks>,
}

impl<S, C, D, K> Clone for ChatOrchestrator<S, C, D, K>
where
    S: SessionStore + 'static,
    C: CompletionClient + 'static,
    D: Delay + 'static,
    K: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            completion: self.completion.clone(),
            generation: Arc::clone(&self.generation),
            context: Arc::clone(&self.context),
            fallbacks: Arc::clone(&self.fallbacks),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S, C, D, K> ChatOrchestrator<S, C, D, K>
where
    S: SessionStore + 'static,
    C: CompletionClient + 'static,
    D: Delay + 'static,
    K: Clock + Send + Sync + 'static,
{
    /// Creates an orchestrator without an external credential.
    ///
    /// Until [`Self::with_completion`] is applied every accepted message is
    /// answered with [`FallbackReplies::contact_us`].
    #[must_use]
    pub fn new(
        sessions: SessionService<S, K>,
        context: ContextBuilder,
        fallbacks: FallbackReplies,
    ) -> Self {
        Self {
            sessions,
            completion: None,
            generation: Arc::new(GenerationConfig::default()),
            context: Arc::new(context),
            fallbacks: Arc::new(fallbacks),
            locks: Arc::new(SessionLocks::new()),
        }
    }

    /// Enables external completion with the given client and settings.
    #[must_use]
    pub fn with_completion(
        mut self,
        completion: RetryingCompletion<C, D>,
        generation: GenerationConfig,
    ) -> Self {
        self.completion = Some(completion);
        self.generation = Arc::new(generation);
        self
    }

    /// Returns `true` when an external client is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.completion.is_some()
    }

    /// Handles one inbound message.
    ///
    /// Returns `success: false` only when validation fails; storage,
    /// external and internal failures all produce a benign reply.
    pub async fn reply(&self, request: ChatRequest) -> ChatResponse {
        let message = match UserMessage::parse(request.message.as_deref()) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "rejected chat message");
                return ChatResponse::rejected(&err);
            }
        };
        let requested = request
            .session_id
            .as_deref()
            .and_then(|raw| SessionId::new(raw).ok());

        let this = self.clone();
        let task = tokio::spawn(async move { this.converse(message, requested).await });

        let response = match task.await {
            Ok(Ok(response)) => response,
            Ok(Err(fault)) => self.fault_reply(&fault),
            Err(join_err) => self.fault_reply(&ChatFault::from(join_err)),
        };

        info!(
            session_id = response.session_id.as_deref().unwrap_or_default(),
            outcome = response.outcome.as_str(),
            persisted = response.persisted,
            "chat reply sent"
        );
        response
    }

    /// Returns the stored history for `session_id`.
    ///
    /// An identifier that cannot name a session yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the lookup fails.
    pub async fn history(&self, session_id: &str) -> StorageResult<Option<Session>> {
        match SessionId::new(session_id) {
            Ok(id) => self.sessions.get(&id).await,
            Err(_) => Ok(None),
        }
    }

    /// Removes sessions idle for longer than `ttl`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the purge fails.
    pub async fn purge_idle(&self, ttl: Duration) -> StorageResult<usize> {
        self.sessions.purge_idle(ttl).await
    }

    async fn converse(
        &self,
        message: UserMessage,
        requested: Option<SessionId>,
    ) -> Result<ChatResponse, ChatFault> {
        let session_id = requested.unwrap_or_else(|| SessionId::mint(self.sessions.clock()));
        let _guard = self.locks.acquire(&session_id).await;
        let mut session = self.sessions.create_or_get(Some(session_id)).await?;

        let Some(completion) = &self.completion else {
            debug!(session_id = %session.session_id(), "no credential configured; using contact reply");
            self.sessions.append(&mut session, Role::User, message.as_str());
            let reply = self.fallbacks.contact_us().to_owned();
            return Ok(self.finish(session, reply, ReplyOutcome::Unconfigured).await);
        };

        let prompt = self.context.build(&session, message.as_str());
        self.sessions.append(&mut session, Role::User, message.as_str());

        let (reply, outcome) = match completion.complete(&prompt, &self.generation).await {
            Ok(text) => (text, ReplyOutcome::Completed),
            Err(err) => {
                warn!(
                    session_id = %session.session_id(),
                    attempts = err.attempts(),
                    error = %err,
                    "external completion failed; using fallback reply"
                );
                let fallback = self
                    .fallbacks
                    .pick_unavailable(&mut rand::thread_rng())
                    .to_owned();
                (fallback, ReplyOutcome::ExternalFallback)
            }
        };

        Ok(self.finish(session, reply, outcome).await)
    }

    /// Appends the assistant turn, persists best-effort and builds the response.
    async fn finish(
        &self,
        mut session: Session,
        reply: String,
        outcome: ReplyOutcome,
    ) -> ChatResponse {
        self.sessions.append(&mut session, Role::Assistant, reply.as_str());

        let persisted = match self.sessions.persist(&session).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    session_id = %session.session_id(),
                    error = %err,
                    "failed to persist chat session"
                );
                false
            }
        };

        ChatResponse::replied(reply, session.session_id(), outcome).with_persisted(persisted)
    }

    fn fault_reply(&self, fault: &ChatFault) -> ChatResponse {
        let session_id = SessionId::mint_fallback(self.sessions.clock());
        error!(
            session_id = %session_id,
            error = %fault,
            "chat request failed; using fault reply"
        );
        ChatResponse::replied(self.fallbacks.fault(), &session_id, ReplyOutcome::Fault)
    }
}

#[async_trait]
impl<S, C, D, K> ChatPort for ChatOrchestrator<S, C, D, K>
where
    S: SessionStore + 'static,
    C: CompletionClient + 'static,
    D: Delay + 'static,
    K: Clock + Send + Sync + 'static,
{
    async fn reply(&self, request: ChatRequest) -> ChatResponse {
        Self::reply(self, request).await
    }

    async fn history(&self, session_id: &str) -> StorageResult<Option<Session>> {
        Self::history(self, session_id).await
    }

    async fn purge_idle(&self, ttl: Duration) -> StorageResult<usize> {
        Self::purge_idle(self, ttl).await
    }

    fn is_configured(&self) -> bool {
        Self::is_configured(self)
    }
}

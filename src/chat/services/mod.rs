//! Service layer for the chat relay.
//!
//! - [`ContextBuilder`] renders bounded prompts
//! - [`RetryingCompletion`] wraps a [`crate::chat::ports::CompletionClient`]
//!   in a bounded exponential-backoff loop
//! - [`SessionService`] resolves, appends to and persists sessions
//! - [`SessionLocks`] serialises work per session identifier
//! - [`ChatOrchestrator`] ties the above together per inbound message

mod context;
mod fallback;
mod locks;
mod orchestrator;
mod retry;
mod sessions;

pub use context::{ContextBuilder, DEFAULT_CONTEXT_WINDOW, HISTORY_HEADING, build_prompt};
pub use fallback::FallbackReplies;
pub use locks::SessionLocks;
pub use orchestrator::{ChatOrchestrator, ChatRequest, ChatResponse, ReplyOutcome};
pub use retry::{EMPTY_COMPLETION_REPLY, ExternalError, RetryPolicy, RetryingCompletion};
pub use sessions::SessionService;

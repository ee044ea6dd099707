//! Port contracts for the chat relay.
//!
//! Ports define infrastructure-agnostic interfaces used by the chat
//! services. Outbound ports cover persistence, the external generation
//! call and backoff sleeping; [`chat::ChatPort`] is the inbound port the
//! HTTP layer drives.

pub mod chat;
pub mod completion;
pub mod delay;
pub mod session_store;

pub use chat::ChatPort;
pub use completion::{AttemptError, CompletionClient, FailureClass, GenerationConfig};
pub use delay::Delay;
pub use session_store::{SessionStore, StorageError, StorageResult};

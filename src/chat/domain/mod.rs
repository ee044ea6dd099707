//! Domain model for chat sessions.
//!
//! Sessions own an append-only list of turns. Timestamps come from an
//! injected [`mockable::Clock`] so that ordering can be asserted
//! deterministically. No infrastructure concerns cross this boundary.

mod error;
mod ids;
mod message;
mod role;
mod session;
mod turn;

pub use error::{ChatDomainError, ParseRoleError, ValidationError};
pub use ids::SessionId;
pub use message::UserMessage;
pub use role::Role;
pub use session::{PersistedSession, Session};
pub use turn::Turn;

//! In-memory adapter implementations.
//!
//! Used by tests and by the server when no database is configured.

mod session_store;

pub use session_store::InMemorySessionStore;

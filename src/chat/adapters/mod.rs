//! Adapter implementations of the chat ports.
//!
//! # Available Adapters
//!
//! - [`memory::InMemorySessionStore`]: thread-safe in-memory storage, used
//!   in tests and when no database is configured
//! - [`postgres::PostgresSessionStore`]: `PostgreSQL` persistence using
//!   Diesel ORM
//! - [`gemini::GeminiCompletionClient`]: HTTP client for the generative
//!   language API
//! - [`delay::TokioDelay`] and [`delay::RecordingDelay`]: real and recorded
//!   backoff sleeping

pub mod delay;
pub mod gemini;
pub mod memory;
pub mod postgres;

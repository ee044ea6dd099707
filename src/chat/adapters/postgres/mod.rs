//! `PostgreSQL` adapter for chat session persistence.

mod models;
mod repository;
mod schema;

pub use repository::{ChatPgPool, PostgresSessionStore};

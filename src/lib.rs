//! Parley: a conversational relay between website visitors and a hosted
//! language model.
//!
//! Each visitor message is validated, attached to a persisted session,
//! rendered into a bounded prompt and sent to the generation service with
//! retry and backoff. Failures degrade to canned replies so visitors always
//! receive an answer.
//!
//! # Architecture
//!
//! Parley follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`chat`]: Sessions, prompt assembly, completion and orchestration
//! - [`app`]: Wiring of adapters into a ready-to-serve chat service
//! - [`api`]: HTTP routes over the chat service

pub mod api;
pub mod app;
pub mod chat;

//! Chat relay: session history, prompt assembly and resilient completion.
//!
//! Every inbound message resolves (or creates) a [`domain::Session`],
//! renders a bounded prompt, calls the external generation service through
//! a bounded retry loop, and appends the reply before persisting. Failures
//! below the orchestrator are absorbed into benign replies; only input
//! validation produces a non-success response.
//!
//! The module follows the same hexagonal split as the rest of the crate:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Environment-driven settings in [`config`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

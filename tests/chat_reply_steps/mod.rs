//! Step definitions for chat reply scenarios.

mod given;
mod then;
mod when;
pub mod world;

//! HTTP client for the generative-language `generateContent` endpoint.

mod client;
mod wire;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiCompletionClient};

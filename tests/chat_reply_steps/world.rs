//! Shared world state for chat reply BDD scenarios.

use crate::test_helpers::{ScriptedCompletion, memory_chat_service};
use parley::chat::{
    adapters::{delay::RecordingDelay, memory::InMemorySessionStore},
    ports::ChatPort,
    services::ChatResponse,
};
use rstest::fixture;
use std::sync::Arc;

/// Scenario world for chat reply behaviour tests.
#[derive(Default)]
pub struct ChatWorld {
    pub service: Option<Arc<dyn ChatPort>>,
    pub store: Option<Arc<InMemorySessionStore>>,
    pub delay: Option<RecordingDelay>,
    pub completion: Option<Arc<ScriptedCompletion>>,
    pub last_response: Option<ChatResponse>,
}

impl ChatWorld {
    /// Wires a fresh service, optionally backed by `completion`.
    pub fn install(&mut self, completion: Option<ScriptedCompletion>) {
        let shared = completion.map(Arc::new);
        let (service, store, delay) = memory_chat_service(shared.clone());
        self.service = Some(service);
        self.store = Some(store);
        self.delay = Some(delay);
        self.completion = shared;
    }

    /// Returns the configured service.
    pub fn service(&self) -> Result<Arc<dyn ChatPort>, eyre::Report> {
        self.service
            .clone()
            .ok_or_else(|| eyre::eyre!("chat service not configured in scenario world"))
    }

    /// Returns the last response received.
    pub fn response(&self) -> Result<&ChatResponse, eyre::Report> {
        self.last_response
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no response recorded in scenario world"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ChatWorld {
    ChatWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

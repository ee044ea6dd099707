//! When steps for chat reply scenarios.

use super::world::{ChatWorld, run_async};
use parley::chat::services::ChatRequest;
use rstest_bdd_macros::when;

fn send(world: &mut ChatWorld, request: ChatRequest) -> Result<(), eyre::Report> {
    let service = world.service()?;
    world.last_response = Some(run_async(service.reply(request)));
    Ok(())
}

#[when(r#"a visitor sends "{message}" without a session"#)]
fn send_without_session(world: &mut ChatWorld, message: String) -> Result<(), eyre::Report> {
    send(world, ChatRequest::new(message))
}

#[when(r#"a visitor sends "{message}" on session "{session_id}""#)]
fn send_on_session(
    world: &mut ChatWorld,
    message: String,
    session_id: String,
) -> Result<(), eyre::Report> {
    send(world, ChatRequest::new(message).with_session_id(session_id))
}

#[when(r#"a visitor sends an empty message on session "{session_id}""#)]
fn send_empty_on_session(world: &mut ChatWorld, session_id: String) -> Result<(), eyre::Report> {
    send(world, ChatRequest::new("").with_session_id(session_id))
}

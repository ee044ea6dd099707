//! Then steps for chat reply scenarios.

use super::world::{ChatWorld, run_async};
use parley::chat::{domain::SessionId, ports::SessionStore, services::FallbackReplies};
use rstest_bdd_macros::then;
use std::time::Duration;

fn stored_turns(world: &ChatWorld, session_id: &str) -> Result<Option<usize>, eyre::Report> {
    let store = world
        .store
        .clone()
        .ok_or_else(|| eyre::eyre!("store not configured in scenario world"))?;
    let id = SessionId::new(session_id).map_err(|err| eyre::eyre!("invalid session id: {err}"))?;
    let session = run_async(store.get(&id)).map_err(|err| eyre::eyre!("lookup failed: {err}"))?;
    Ok(session.map(|s| s.turn_count()))
}

fn reply_text(world: &ChatWorld) -> Result<String, eyre::Report> {
    let response = world.response()?;
    if !response.success {
        return Err(eyre::eyre!("expected success, got {response:?}"));
    }
    response
        .reply
        .clone()
        .ok_or_else(|| eyre::eyre!("response carried no reply"))
}

#[then("the reply is the contact reply")]
fn reply_is_contact(world: &ChatWorld) -> Result<(), eyre::Report> {
    let reply = reply_text(world)?;
    if reply != FallbackReplies::default().contact_us() {
        return Err(eyre::eyre!("unexpected reply: {reply}"));
    }
    Ok(())
}

#[then("the reply is a canned unavailable reply")]
fn reply_is_unavailable(world: &ChatWorld) -> Result<(), eyre::Report> {
    let reply = reply_text(world)?;
    if !FallbackReplies::default().unavailable().contains(&reply) {
        return Err(eyre::eyre!("reply is not a canned unavailable text: {reply}"));
    }
    Ok(())
}

#[then(r#"the reply is "{expected}""#)]
fn reply_is(world: &ChatWorld, expected: String) -> Result<(), eyre::Report> {
    let reply = reply_text(world)?;
    if reply != expected {
        return Err(eyre::eyre!("expected reply {expected:?}, got {reply:?}"));
    }
    Ok(())
}

#[then(r#"a new session id starting with "{prefix}" is returned"#)]
fn session_id_has_prefix(world: &ChatWorld, prefix: String) -> Result<(), eyre::Report> {
    let response = world.response()?;
    match response.session_id.as_deref() {
        Some(id) if id.starts_with(&prefix) => Ok(()),
        other => Err(eyre::eyre!("unexpected session id: {other:?}")),
    }
}

#[then("the returned session holds {count:usize} turns")]
fn returned_session_turns(world: &ChatWorld, count: usize) -> Result<(), eyre::Report> {
    let session_id = world
        .response()?
        .session_id
        .clone()
        .ok_or_else(|| eyre::eyre!("response carried no session id"))?;
    expect_turns(world, &session_id, count)
}

#[then(r#"session "{session_id}" holds {count:usize} turns"#)]
fn session_turns(world: &ChatWorld, session_id: String, count: usize) -> Result<(), eyre::Report> {
    expect_turns(world, &session_id, count)
}

fn expect_turns(world: &ChatWorld, session_id: &str, count: usize) -> Result<(), eyre::Report> {
    match stored_turns(world, session_id)? {
        Some(found) if found == count => Ok(()),
        other => Err(eyre::eyre!(
            "expected {count} turns in {session_id}, found {other:?}"
        )),
    }
}

#[then(r#"the request is rejected with "{message}""#)]
fn request_rejected(world: &ChatWorld, message: String) -> Result<(), eyre::Report> {
    let response = world.response()?;
    if response.success || response.message.as_deref() != Some(message.as_str()) {
        return Err(eyre::eyre!("expected rejection, got {response:?}"));
    }
    if response.reply.is_some() || response.session_id.is_some() {
        return Err(eyre::eyre!("rejection must not carry a reply or session id"));
    }
    Ok(())
}

#[then(r#"no session "{session_id}" is stored"#)]
fn no_session_stored(world: &ChatWorld, session_id: String) -> Result<(), eyre::Report> {
    match stored_turns(world, &session_id)? {
        None => Ok(()),
        Some(found) => Err(eyre::eyre!("unexpected session with {found} turns")),
    }
}

#[then("the external service was called {count:usize} times")]
fn external_calls(world: &ChatWorld, count: usize) -> Result<(), eyre::Report> {
    let completion = world
        .completion
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no external service in scenario world"))?;
    let calls = completion.prompts().len();
    if calls != count {
        return Err(eyre::eyre!("expected {count} calls, saw {calls}"));
    }
    Ok(())
}

#[then("the retry waits were {first:u64} ms then {second:u64} ms")]
fn retry_waits(world: &ChatWorld, first: u64, second: u64) -> Result<(), eyre::Report> {
    let delay = world
        .delay
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no delay recorder in scenario world"))?;
    let expected = vec![Duration::from_millis(first), Duration::from_millis(second)];
    let requested = delay.requested();
    if requested != expected {
        return Err(eyre::eyre!("expected waits {expected:?}, saw {requested:?}"));
    }
    Ok(())
}

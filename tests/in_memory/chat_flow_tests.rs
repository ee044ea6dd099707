//! End-to-end chat flows over the in-memory store.

use crate::test_helpers::{
    FlakyStore, ScriptedCompletion, TEST_INSTRUCTIONS, chat_service, memory_chat_service,
};
use parley::chat::{
    domain::{Role, SessionId},
    ports::{AttemptError, SessionStore},
    services::{ChatRequest, FallbackReplies},
};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conversation_grows_by_two_turns_per_message() {
    let completion = Arc::new(ScriptedCompletion::replying("Glad to help."));
    let (service, store, delay) = memory_chat_service(Some(Arc::clone(&completion)));

    let first = service.reply(ChatRequest::new("Hi")).await;
    let session_id = first.session_id.clone().expect("session id returned");
    let id = SessionId::new(session_id.as_str()).expect("valid id");

    for text in ["What do you build?", "Thanks"] {
        let response = service
            .reply(ChatRequest::new(text).with_session_id(session_id.as_str()))
            .await;
        assert_eq!(response.reply.as_deref(), Some("Glad to help."));
        assert_eq!(response.session_id.as_deref(), Some(session_id.as_str()));
    }

    let session = store
        .get(&id)
        .await
        .expect("lookup")
        .expect("session stored");
    let roles: Vec<_> = session.messages().iter().map(|t| t.role()).collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
    assert!(session.created_at() <= session.last_activity());
    assert!(delay.requested().is_empty());

    let prompts = completion.prompts();
    let last_prompt = prompts.last().expect("prompt captured");
    assert!(last_prompt.starts_with(TEST_INSTRUCTIONS));
    assert!(last_prompt.ends_with("User: Thanks\n\nAssistant:"));
    assert!(last_prompt.contains("User: What do you build?\nAssistant: Glad to help."));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_is_available_through_the_port() {
    let (service, _store, _delay) = memory_chat_service(None);

    service
        .reply(ChatRequest::new("Hello").with_session_id("visitor-42"))
        .await;

    let session = service
        .history("visitor-42")
        .await
        .expect("lookup")
        .expect("session stored");
    assert_eq!(session.turn_count(), 2);
    assert_eq!(session.messages()[0].content(), "Hello");
    assert_eq!(
        session.messages()[1].content(),
        FallbackReplies::default().contact_us()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_then_success_within_bound() {
    let completion = Arc::new(ScriptedCompletion::replying("Recovered.").with_queue([
        Err(AttemptError::Timeout(Duration::from_secs(10))),
        Err(AttemptError::Status {
            status: 500,
            message: "INTERNAL: oops".to_owned(),
        }),
    ]));
    let (service, _store, delay) = memory_chat_service(Some(completion));

    let response = service.reply(ChatRequest::new("Hello")).await;

    assert_eq!(response.reply.as_deref(), Some("Recovered."));
    assert_eq!(
        delay.requested(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn quota_failure_falls_back_without_backoff() {
    let completion = Arc::new(
        ScriptedCompletion::replying("unused")
            .with_queue([Err(AttemptError::Quota("RESOURCE_EXHAUSTED".to_owned()))]),
    );
    let (service, _store, delay) = memory_chat_service(Some(Arc::clone(&completion)));

    let response = service.reply(ChatRequest::new("Hello")).await;

    assert!(response.success);
    let reply = response.reply.expect("reply present");
    assert!(FallbackReplies::default().unavailable().contains(&reply));
    assert_eq!(completion.prompts().len(), 1);
    assert!(delay.requested().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn write_failures_do_not_block_replies() {
    let store = Arc::new(FlakyStore::failing_writes());
    let (service, _delay) = chat_service(store, Some(Arc::new(ScriptedCompletion::replying("Hi!"))));

    let response = service
        .reply(ChatRequest::new("Hello").with_session_id("abc"))
        .await;

    assert!(response.success);
    assert_eq!(response.reply.as_deref(), Some("Hi!"));
    assert_eq!(response.session_id.as_deref(), Some("abc"));
    assert!(!response.persisted);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn read_failures_produce_fault_reply() {
    let store = Arc::new(FlakyStore::failing_reads());
    let (service, _delay) = chat_service(store, Some(Arc::new(ScriptedCompletion::replying("Hi!"))));

    let response = service
        .reply(ChatRequest::new("Hello").with_session_id("abc"))
        .await;

    assert!(response.success);
    assert_eq!(
        response.reply.as_deref(),
        Some(FallbackReplies::default().fault())
    );
    assert!(
        response
            .session_id
            .is_some_and(|id| id.starts_with("fallback_"))
    );
}

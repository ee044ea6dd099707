//! Concurrent messages against shared and separate sessions.

use crate::test_helpers::{ScriptedCompletion, memory_chat_service};
use parley::chat::{
    domain::{Role, SessionId},
    ports::SessionStore,
    services::ChatRequest,
};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_on_one_session_are_not_interleaved() {
    let completion =
        Arc::new(ScriptedCompletion::replying("ack").with_latency(Duration::from_millis(50)));
    let (service, store, _delay) = memory_chat_service(Some(completion));

    let first = service.reply(ChatRequest::new("A").with_session_id("shared"));
    let second = service.reply(ChatRequest::new("B").with_session_id("shared"));
    let (a, b) = tokio::join!(first, second);
    assert!(a.success && b.success);

    let session = store
        .get(&SessionId::new("shared").expect("valid id"))
        .await
        .expect("lookup")
        .expect("session stored");
    let turns: Vec<_> = session
        .messages()
        .iter()
        .map(|t| (t.role(), t.content().to_owned()))
        .collect();

    assert_eq!(turns.len(), 4);
    for pair in turns.chunks(2) {
        assert_eq!(pair[0].0, Role::User);
        assert_eq!(pair[1].0, Role::Assistant);
    }
    let mut users: Vec<_> = turns
        .iter()
        .filter(|(role, _)| *role == Role::User)
        .map(|(_, content)| content.as_str())
        .collect();
    users.sort_unstable();
    assert_eq!(users, vec!["A", "B"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_sessions_progress_independently() {
    let completion =
        Arc::new(ScriptedCompletion::replying("ack").with_latency(Duration::from_millis(20)));
    let (service, store, _delay) = memory_chat_service(Some(completion));

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let svc = Arc::clone(&service);
            tokio::spawn(async move {
                svc.reply(ChatRequest::new("Hi").with_session_id(format!("visitor-{n}")))
                    .await
            })
        })
        .collect();
    for task in tasks {
        let response = task.await.expect("task completes");
        assert!(response.success);
    }

    assert_eq!(store.len(), 8);
}

//! Subscriber and completion-callback registration.

use crate::prelude::*;

#[tokio::test]
async fn subscribe_then_unsubscribe_restores_registry() {
    let tracker = tracker();
    let keep = tracker.subscribe(CHAT);
    let before = tracker.subscriber_count(CHAT);

    let subscription = tracker.subscribe(CHAT);
    assert_eq!(tracker.subscriber_count(CHAT), before + 1);

    assert!(tracker.unsubscribe(&subscription.id));
    assert!(!tracker.unsubscribe(&subscription.id));
    assert_eq!(tracker.subscriber_count(CHAT), before);
    drop(keep);
}

#[tokio::test(start_paused = true)]
async fn updates_only_reach_subscribers_of_the_same_chat() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed" }));
    let mut mine = tracker.subscribe(CHAT);
    let mut other = tracker.subscribe("chat-2");
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    completions.recv().await.unwrap();

    assert_eq!(statuses(&drain(&mut mine)), vec!["pending", "completed"]);
    assert!(drain(&mut other).is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_subscribers_are_pruned_on_publish() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed" }));
    let gone = tracker.subscribe(CHAT);
    drop(gone);
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    completions.recv().await.unwrap();

    assert_eq!(tracker.subscriber_count(CHAT), 0);
}

#[tokio::test(start_paused = true)]
async fn completion_callback_only_sees_terminal_events() {
    let tracker = tracker();
    tracker
        .executor()
        .respond_json(STATUS_TOOL, json!({ "state": "running" }));
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed" }));
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    let first = completions.recv().await.unwrap();

    assert_eq!(first.status, "completed");
    idle(10).await;
    assert!(completions.try_recv().is_err());
    assert!(tracker.unregister_completion_callback(CHAT));
    assert!(!tracker.has_completion_callback(CHAT));
}

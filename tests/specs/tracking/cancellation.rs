//! Local stops and remote cancellation.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn stop_tracking_marks_operation_cancelled() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "running" }));
    let mut subscription = tracker.subscribe(CHAT);
    let mut completions = tracker.register_completion_callback(CHAT);
    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    idle(2).await;

    assert!(tracker.stop_tracking("call-1"));

    let op = tracker.get_operation("call-1").unwrap();
    assert_eq!(op.status, "cancelled");
    assert!(op.completed_at.is_some());
    let completion = completions.recv().await.unwrap();
    assert_eq!(completion.status, "cancelled");

    // A second stop changes nothing and nothing is published afterwards
    drain(&mut subscription);
    assert!(!tracker.stop_tracking("call-1"));
    let polls = tracker.executor().calls_to(STATUS_TOOL).len();
    idle(10).await;
    assert_eq!(tracker.executor().calls_to(STATUS_TOOL).len(), polls);
    assert!(drain(&mut subscription).is_empty());
    assert!(completions.try_recv().is_err());
    assert_eq!(tracker.get_operation("call-1").unwrap().status, "cancelled");
}

#[tokio::test(start_paused = true)]
async fn cancel_operation_invokes_cancel_tool() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "running" }));
    tracker
        .executor()
        .always_json(CANCEL_TOOL, json!({ "cancelled": true }));
    let scope = CancellationToken::new();
    tracker
        .start_tracking(&scope, request("call-1", behavior()))
        .unwrap();

    tracker.cancel_operation(&scope, "call-1").await.unwrap();

    let cancels = tracker.executor().calls_to(CANCEL_TOOL);
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].arguments, json!({ "run_id": "run-call-1" }));
    assert_eq!(tracker.get_operation("call-1").unwrap().status, "cancelled");
}

#[tokio::test(start_paused = true)]
async fn failed_remote_cancel_leaves_operation_untouched() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "running" }));
    tracker
        .executor()
        .fail_transport(CANCEL_TOOL, "cancel endpoint unavailable");
    let scope = CancellationToken::new();
    tracker
        .start_tracking(&scope, request("call-1", behavior()))
        .unwrap();

    let err = tracker.cancel_operation(&scope, "call-1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalCancel);
    let op = tracker.get_operation("call-1").unwrap();
    assert!(!op.is_terminal());
    assert_eq!(tracker.get_active_operations(CHAT).len(), 1);
    tracker.shutdown();
}

#[tokio::test(start_paused = true)]
async fn cancel_unknown_operation_is_not_found() {
    let tracker = tracker();

    let err = tracker
        .cancel_operation(&CancellationToken::new(), "nope")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

//! Registering an operation from a tool result.

use crate::prelude::*;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn operation_id_is_extracted_and_pending_update_published() {
    let tracker = tracker();
    let mut subscription = tracker.subscribe(CHAT);

    let op = tracker
        .start_tracking(
            &CancellationToken::new(),
            TrackRequest::new(
                "call-1",
                CHAT,
                json!({ "run_id": "run-123", "status": "pending" }),
                Arc::new(behavior()),
            ),
        )
        .unwrap();

    assert_eq!(op.external_run_id, "run-123");
    assert_eq!(
        tracker.get_operation("call-1").unwrap().external_run_id,
        "run-123"
    );

    let initial = subscription.receiver.try_recv().unwrap();
    assert_eq!(initial.tool_call_id, "call-1");
    assert_eq!(initial.status, "pending");
    assert!(!initial.is_terminal);
    tracker.shutdown();
}

#[tokio::test(start_paused = true)]
async fn missing_operation_id_is_a_configuration_error() {
    let tracker = tracker();
    let mut subscription = tracker.subscribe(CHAT);

    let err = tracker
        .start_tracking(
            &CancellationToken::new(),
            TrackRequest::new("call-1", CHAT, json!({ "status": "pending" }), Arc::new(behavior())),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(tracker.get_operation("call-1").is_none());

    // No poller was started
    idle(10).await;
    assert!(tracker.executor().calls().is_empty());
    assert!(drain(&mut subscription).is_empty());
}

#[tokio::test(start_paused = true)]
async fn reregistering_a_live_id_is_rejected() {
    let tracker = tracker();
    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();

    let err = tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(tracker.operation_count(), 1);
    tracker.shutdown();
}

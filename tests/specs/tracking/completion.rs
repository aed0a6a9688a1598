//! Polling an operation to a terminal status.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn successful_completion_delivers_result_once() {
    let tracker = tracker();
    tracker
        .executor()
        .respond_json(STATUS_TOOL, json!({ "state": "running", "progress": 50 }));
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed", "output": { "answer": 42 } }));
    let mut subscription = tracker.subscribe(CHAT);
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    let completion = completions.recv().await.unwrap();

    assert_eq!(completion.status, "completed");
    assert_eq!(completion.result, Some(json!({ "answer": 42 })));

    let op = tracker.get_operation("call-1").unwrap();
    assert_eq!(op.status, "completed");
    assert_eq!(op.result, Some(json!({ "answer": 42 })));
    let completed_at = op.completed_at.unwrap();

    // Terminal records are frozen and publish nothing further
    idle(30).await;
    assert!(completions.try_recv().is_err());
    assert_eq!(
        tracker.get_operation("call-1").unwrap().completed_at,
        Some(completed_at)
    );
    let updates = drain(&mut subscription);
    assert_eq!(statuses(&updates), vec!["pending", "running", "completed"]);
    assert_eq!(updates.iter().filter(|u| u.is_terminal).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_status_is_terminal_with_error() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "failed", "error": "GPU quota exceeded" }));
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    let completion = completions.recv().await.unwrap();

    assert_eq!(completion.status, "failed");
    assert_eq!(completion.error.as_deref(), Some("GPU quota exceeded"));
    assert!(tracker.get_active_operations(CHAT).is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_status_failures_do_not_end_polling() {
    let tracker = tracker();
    tracker
        .executor()
        .fail_transport(STATUS_TOOL, "connection refused");
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed" }));
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
        .unwrap();
    let completion = completions.recv().await.unwrap();

    assert_eq!(completion.status, "completed");
    assert_eq!(tracker.executor().calls_to(STATUS_TOOL).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn identical_responses_produce_identical_events() {
    async fn run() -> Vec<(String, Option<u8>, bool)> {
        let tracker = tracker();
        tracker
            .executor()
            .respond_json(STATUS_TOOL, json!({ "state": "running", "progress": 10 }));
        tracker
            .executor()
            .respond_json(STATUS_TOOL, json!({ "state": "running", "progress": 250 }));
        tracker
            .executor()
            .always_json(STATUS_TOOL, json!({ "state": "completed" }));
        let mut subscription = tracker.subscribe(CHAT);
        let mut completions = tracker.register_completion_callback(CHAT);

        tracker
            .start_tracking(&CancellationToken::new(), request("call-1", behavior()))
            .unwrap();
        completions.recv().await.unwrap();
        drain(&mut subscription)
            .into_iter()
            .map(|u| (u.status, u.progress, u.is_terminal))
            .collect()
    }

    let first = run().await;
    assert_eq!(first, run().await);
    assert_eq!(first[2].1, Some(100));
}

//! Operations that never finish within their polling budget.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn deadline_marks_operation_timed_out() {
    let tracker = tracker();
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "running" }));
    let mut subscription = tracker.subscribe(CHAT);
    let mut completions = tracker.register_completion_callback(CHAT);

    tracker
        .start_tracking(
            &CancellationToken::new(),
            request("call-1", with_max_duration(behavior(), 1)),
        )
        .unwrap();
    let started = tokio::time::Instant::now();
    let completion = completions.recv().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(completion.status, "timeout");
    assert_eq!(completion.error.as_deref(), Some("Operation timed out"));

    let op = tracker.get_operation("call-1").unwrap();
    assert_eq!(op.status, "timeout");
    assert_eq!(op.error.as_deref(), Some("Operation timed out"));

    let updates = drain(&mut subscription);
    let last = updates.last().unwrap();
    assert!(last.is_terminal);
    assert_eq!(last.status, "timeout");
}

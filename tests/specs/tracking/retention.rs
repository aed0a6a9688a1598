//! Dropping long-finished operations.

use crate::prelude::*;
use std::time::Duration;

const SLOW_STATUS_TOOL: &str = "get_slow_status";

#[tokio::test(start_paused = true)]
async fn cleanup_removes_only_operations_finished_before_the_window() {
    let clock = FakeClock::new();
    let tracker = tracker_with_clock(clock.clone());
    tracker
        .executor()
        .always_json(STATUS_TOOL, json!({ "state": "completed" }));
    tracker
        .executor()
        .always_json(SLOW_STATUS_TOOL, json!({ "state": "running" }));
    let mut completions = tracker.register_completion_callback(CHAT);
    let scope = CancellationToken::new();

    tracker.start_tracking(&scope, request("old", behavior())).unwrap();
    completions.recv().await.unwrap();
    clock.advance(Duration::from_secs(115 * 60));

    tracker.start_tracking(&scope, request("recent", behavior())).unwrap();
    completions.recv().await.unwrap();
    clock.advance(Duration::from_secs(5 * 60));

    tracker
        .start_tracking(
            &scope,
            request("running", with_status_tool(behavior(), SLOW_STATUS_TOOL)),
        )
        .unwrap();

    assert_eq!(tracker.cleanup_stale_operations(Duration::from_secs(3600)), 1);

    assert!(tracker.get_operation("old").is_none());
    assert!(tracker.get_operation("recent").is_some());
    assert!(tracker.get_operation("running").is_some());
    scope.cancel();
}

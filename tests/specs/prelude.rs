//! Shared helpers for tracker specs.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

pub use serde_json::json;
pub use tokio_util::sync::CancellationToken;
pub use tw_adapters::FakeToolExecutor;
pub use tw_core::{
    AsyncBehavior, CancellationBinding, CompletionConditions, FakeClock, OperationUpdate,
    ProgressTracking, SequentialIdGen, StatusPolling,
};
pub use tw_engine::{ErrorKind, Subscription, TrackRequest, Tracker, TrackerConfig};

pub type SpecTracker = Tracker<FakeToolExecutor, FakeClock, SequentialIdGen>;

pub const CHAT: &str = "chat-1";
pub const STATUS_TOOL: &str = "get_training_status";
pub const CANCEL_TOOL: &str = "cancel_training";

pub fn tracker() -> SpecTracker {
    tracker_with_clock(FakeClock::new())
}

pub fn tracker_with_clock(clock: FakeClock) -> SpecTracker {
    Tracker::new(
        FakeToolExecutor::new(),
        clock,
        SequentialIdGen::new("sub"),
        TrackerConfig::default(),
    )
}

/// Behavior polling `STATUS_TOOL` with `run_id` every second
pub fn behavior() -> AsyncBehavior {
    AsyncBehavior {
        status_polling: Some(StatusPolling {
            status_tool: STATUS_TOOL.to_string(),
            status_tool_id_param: "run_id".to_string(),
            operation_id_field: "run_id".to_string(),
            poll_interval_seconds: 1,
            max_poll_duration_seconds: 300,
        }),
        completion_conditions: Some(CompletionConditions {
            status_field: "state".to_string(),
            success_values: vec!["completed".to_string()],
            failure_values: vec!["failed".to_string()],
            result_field: Some("output".to_string()),
            error_field: Some("error".to_string()),
        }),
        progress_tracking: Some(ProgressTracking {
            progress_field: Some("progress".to_string()),
            message_field: Some("message".to_string()),
            phase_field: None,
        }),
        cancellation: Some(CancellationBinding {
            cancel_tool: CANCEL_TOOL.to_string(),
            cancel_tool_id_param: "run_id".to_string(),
        }),
    }
}

pub fn with_max_duration(mut behavior: AsyncBehavior, secs: i64) -> AsyncBehavior {
    if let Some(polling) = behavior.status_polling.as_mut() {
        polling.max_poll_duration_seconds = secs;
    }
    behavior
}

pub fn with_status_tool(mut behavior: AsyncBehavior, tool: &str) -> AsyncBehavior {
    if let Some(polling) = behavior.status_polling.as_mut() {
        polling.status_tool = tool.to_string();
    }
    behavior
}

/// Request for `id` whose tool result carries `run-<id>`
pub fn request(id: &str, behavior: AsyncBehavior) -> TrackRequest {
    TrackRequest::new(
        id,
        CHAT,
        json!({ "run_id": format!("run-{id}"), "status": "pending" }),
        Arc::new(behavior),
    )
    .tool("train_model", "nightly")
}

pub fn drain(subscription: &mut Subscription) -> Vec<OperationUpdate> {
    std::iter::from_fn(|| subscription.receiver.try_recv().ok()).collect()
}

pub fn statuses(updates: &[OperationUpdate]) -> Vec<&str> {
    updates.iter().map(|u| u.status.as_str()).collect()
}

pub async fn idle(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

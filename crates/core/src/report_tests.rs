// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::behavior::{CompletionConditions, ProgressTracking};
use serde_json::json;

fn behavior() -> AsyncBehavior {
    AsyncBehavior {
        completion_conditions: Some(CompletionConditions {
            status_field: "run.state".to_string(),
            success_values: vec!["completed".to_string()],
            failure_values: vec!["failed".to_string()],
            result_field: Some("run.output".to_string()),
            error_field: Some("run.error".to_string()),
        }),
        progress_tracking: Some(ProgressTracking {
            progress_field: Some("run.pct".to_string()),
            message_field: Some("run.note".to_string()),
            phase_field: Some("run.stage".to_string()),
        }),
        ..Default::default()
    }
}

#[test]
fn extracts_every_configured_field() {
    let response = json!({
        "run": {
            "state": "running",
            "pct": 37.8,
            "note": "halfway there",
            "stage": "training",
            "output": { "answer": 42 },
            "error": "none yet"
        }
    });

    let report = StatusReport::extract(&behavior(), &response).unwrap();
    assert_eq!(
        report,
        StatusReport {
            status: Some("running".to_string()),
            progress: Some(37),
            message: Some("halfway there".to_string()),
            phase: Some("training".to_string()),
            result: Some(json!({ "answer": 42 })),
            error: Some("none yet".to_string()),
        }
    );
}

#[test]
fn missing_fields_stay_absent() {
    let report = StatusReport::extract(&behavior(), &json!({ "run": {} })).unwrap();
    assert_eq!(report, StatusReport::default());
}

#[test]
fn non_object_responses_are_inconclusive() {
    assert_eq!(StatusReport::extract(&behavior(), &json!("done")), None);
    assert_eq!(StatusReport::extract(&behavior(), &json!([1, 2])), None);
    assert_eq!(StatusReport::extract(&behavior(), &Value::Null), None);
}

#[test]
fn progress_is_clamped_to_percent_range() {
    let high = json!({ "run": { "pct": 250 } });
    let low = json!({ "run": { "pct": -4 } });
    assert_eq!(
        StatusReport::extract(&behavior(), &high).unwrap().progress,
        Some(100)
    );
    assert_eq!(
        StatusReport::extract(&behavior(), &low).unwrap().progress,
        Some(0)
    );
}

#[test]
fn structured_errors_are_rendered_as_json_text() {
    let response = json!({ "run": { "state": "failed", "error": { "code": 7 } } });
    let report = StatusReport::extract(&behavior(), &response).unwrap();
    assert_eq!(report.error.as_deref(), Some(r#"{"code":7}"#));
}

#[test]
fn without_conditions_only_progress_is_read() {
    let mut behavior = behavior();
    behavior.completion_conditions = None;
    let response = json!({ "run": { "state": "completed", "pct": 10 } });

    let report = StatusReport::extract(&behavior, &response).unwrap();
    assert_eq!(report.status, None);
    assert_eq!(report.progress, Some(10));
}

#[test]
fn extraction_is_deterministic() {
    let response = json!({ "run": { "state": "completed", "output": [1, 2, 3] } });
    assert_eq!(
        StatusReport::extract(&behavior(), &response),
        StatusReport::extract(&behavior(), &response)
    );
}

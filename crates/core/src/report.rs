// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field extraction from status-tool responses

use crate::behavior::AsyncBehavior;
use crate::path;
use serde_json::Value;

/// Everything a single status-tool response said about an operation.
///
/// Fields the behavior does not configure, or that the response does not
/// contain, stay `None` and never overwrite what is already known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub status: Option<String>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub phase: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl StatusReport {
    /// Extract the configured fields from a decoded response.
    ///
    /// Returns `None` when the response is not a JSON object; such
    /// responses are inconclusive and the caller keeps polling.
    pub fn extract(behavior: &AsyncBehavior, response: &Value) -> Option<Self> {
        if !response.is_object() {
            return None;
        }

        let mut report = Self::default();

        if let Some(conditions) = &behavior.completion_conditions {
            report.status = path::lookup_str(response, &conditions.status_field).map(String::from);
            report.result = conditions
                .result_field
                .as_deref()
                .and_then(|field| path::lookup_raw(response, field));
            report.error = conditions
                .error_field
                .as_deref()
                .and_then(|field| path::lookup(response, field))
                .and_then(error_text);
        }

        if let Some(tracking) = &behavior.progress_tracking {
            report.progress = tracking
                .progress_field
                .as_deref()
                .and_then(|field| path::lookup_i64(response, field))
                .map(|pct| pct.clamp(0, 100) as u8);
            report.message = tracking
                .message_field
                .as_deref()
                .and_then(|field| path::lookup_str(response, field))
                .map(String::from);
            report.phase = tracking
                .phase_field
                .as_deref()
                .and_then(|field| path::lookup_str(response, field))
                .map(String::from);
        }

        Some(report)
    }
}

/// Errors are usually strings, but some tools report structured errors
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

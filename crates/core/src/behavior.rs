// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async behavior configuration
//!
//! A tool that starts long-running work declares how to follow it up: which
//! status tool to poll, where the run id lives in its own output, how to
//! recognize completion, where progress is reported, and (optionally) which
//! tool cancels the run. The tracker shares one behavior per operation
//! behind an `Arc` and never mutates it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Poll cadence used when the configured interval is below one second
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polling budget used when the configured duration is not positive
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(60 * 60);

/// Errors from validating an async behavior
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error("tool has no async behavior")]
    Missing,
    #[error("async behavior has no status_polling block")]
    MissingStatusPolling,
    #[error("async behavior field is empty: {0}")]
    EmptyField(&'static str),
}

/// How a tracked operation is followed up after its originating tool returns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncBehavior {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_polling: Option<StatusPolling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_conditions: Option<CompletionConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_tracking: Option<ProgressTracking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<CancellationBinding>,
}

impl AsyncBehavior {
    /// Check that the behavior can drive a poller and return its polling block
    pub fn polling(&self) -> Result<&StatusPolling, BehaviorError> {
        let polling = self
            .status_polling
            .as_ref()
            .ok_or(BehaviorError::MissingStatusPolling)?;

        if polling.status_tool.is_empty() {
            return Err(BehaviorError::EmptyField("status_tool"));
        }
        if polling.status_tool_id_param.is_empty() {
            return Err(BehaviorError::EmptyField("status_tool_id_param"));
        }
        Ok(polling)
    }

    /// Classify a reported status; `None` means the operation is still running
    pub fn outcome(&self, status: &str) -> Option<Outcome> {
        self.completion_conditions.as_ref()?.outcome(status)
    }
}

/// `status_polling` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolling {
    pub status_tool: String,
    pub status_tool_id_param: String,
    /// Dotted path into the originating tool result
    pub operation_id_field: String,
    #[serde(default)]
    pub poll_interval_seconds: i64,
    #[serde(default)]
    pub max_poll_duration_seconds: i64,
}

impl StatusPolling {
    pub fn poll_interval(&self) -> Duration {
        match u64::try_from(self.poll_interval_seconds) {
            Ok(secs) if secs >= 1 => Duration::from_secs(secs),
            _ => DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn max_poll_duration(&self) -> Duration {
        match u64::try_from(self.max_poll_duration_seconds) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_MAX_POLL_DURATION,
        }
    }
}

/// Terminal classification of a reported status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// `completion_conditions` block; all paths point into the status-tool response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConditions {
    pub status_field: String,
    #[serde(default)]
    pub success_values: Vec<String>,
    #[serde(default)]
    pub failure_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_field: Option<String>,
}

impl CompletionConditions {
    /// Success wins when a status appears in both sets
    pub fn outcome(&self, status: &str) -> Option<Outcome> {
        if self.success_values.iter().any(|v| v == status) {
            Some(Outcome::Success)
        } else if self.failure_values.iter().any(|v| v == status) {
            Some(Outcome::Failure)
        } else {
            None
        }
    }
}

/// `progress_tracking` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_field: Option<String>,
}

/// `cancellation` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationBinding {
    pub cancel_tool: String,
    pub cancel_tool_id_param: String,
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;

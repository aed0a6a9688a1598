// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracked operation record
//!
//! One record per asynchronous tool call. The record is created `pending`,
//! follows whatever the status tool reports, and freezes the moment it
//! reaches a terminal status: `completed_at` is written exactly once and
//! nothing changes afterwards.

use crate::behavior::{AsyncBehavior, Outcome};
use crate::event::{CompletionEvent, OperationUpdate};
use crate::report::StatusReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Status of a freshly registered operation
pub const STATUS_PENDING: &str = "pending";
/// Status after a local stop or remote cancel
pub const STATUS_CANCELLED: &str = "cancelled";
/// Status after the polling budget ran out
pub const STATUS_TIMEOUT: &str = "timeout";
/// Error recorded on timeout
pub const TIMEOUT_ERROR: &str = "Operation timed out";

/// State of one tracked asynchronous operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub tool_call_id: String,
    pub chat_id: String,
    pub tool_name: String,
    pub scenario: String,
    pub external_run_id: String,
    #[serde(skip)]
    pub behavior: Arc<AsyncBehavior>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// Create a pending record
    pub fn new(
        tool_call_id: impl Into<String>,
        chat_id: impl Into<String>,
        external_run_id: impl Into<String>,
        behavior: Arc<AsyncBehavior>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            chat_id: chat_id.into(),
            tool_name: String::new(),
            scenario: String::new(),
            external_run_id: external_run_id.into(),
            behavior,
            status: STATUS_PENDING.to_string(),
            progress: None,
            message: None,
            phase: None,
            result: None,
            error: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>, scenario: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self.scenario = scenario.into();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Fold a status report into the record.
    ///
    /// Returns the terminal outcome when the reported status completes the
    /// operation. Reports against an already terminal record are ignored.
    pub fn apply(&mut self, report: StatusReport, now: DateTime<Utc>) -> Option<Outcome> {
        if self.is_terminal() {
            return None;
        }

        let StatusReport {
            status,
            progress,
            message,
            phase,
            result,
            error,
        } = report;

        let outcome = status.as_deref().and_then(|s| self.behavior.outcome(s));
        if let Some(status) = status {
            self.status = status;
        }
        self.progress = progress.or(self.progress);
        self.message = message.or(self.message.take());
        self.phase = phase.or(self.phase.take());
        self.result = result.or(self.result.take());
        self.error = error.or(self.error.take());

        let now = self.touch(now);
        if outcome.is_some() {
            self.completed_at = Some(now);
        }
        outcome
    }

    /// Move to a terminal status unless the record is already terminal.
    ///
    /// Returns whether the transition happened.
    pub fn finish(
        &mut self,
        status: &str,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = status.to_string();
        if error.is_some() {
            self.error = error;
        }
        let now = self.touch(now);
        self.completed_at = Some(now);
        true
    }

    /// Whether the record finished before `cutoff`
    pub fn completed_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.completed_at.is_some_and(|at| at < cutoff)
    }

    pub fn to_update(&self) -> OperationUpdate {
        OperationUpdate {
            tool_call_id: self.tool_call_id.clone(),
            chat_id: self.chat_id.clone(),
            tool_name: self.tool_name.clone(),
            scenario: self.scenario.clone(),
            external_run_id: self.external_run_id.clone(),
            status: self.status.clone(),
            progress: self.progress,
            message: self.message.clone(),
            phase: self.phase.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            is_terminal: self.is_terminal(),
            updated_at: self.updated_at,
        }
    }

    pub fn to_completion(&self) -> CompletionEvent {
        CompletionEvent {
            tool_call_id: self.tool_call_id.clone(),
            chat_id: self.chat_id.clone(),
            status: self.status.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    /// Stamp `updated_at`, never moving it before `started_at`
    fn touch(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.updated_at = now.max(self.started_at);
        self.updated_at
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;

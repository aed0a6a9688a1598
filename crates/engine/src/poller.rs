// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation status poller
//!
//! One task per tracked operation. Each tick calls the status tool, folds
//! the response into the record and publishes the change. The task ends
//! on a terminal status, on timeout, when cancelled, or when its record
//! disappears from the store.

use crate::state::SharedState;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tw_adapters::{ExecutorError, ToolCall, ToolExecution, ToolExecutor};
use tw_core::{AsyncBehavior, Clock, StatusReport, STATUS_TIMEOUT, TIMEOUT_ERROR};

/// What the poll loop does after one status call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

pub(crate) struct Poller<E, C: Clock> {
    pub state: SharedState<C>,
    pub executor: E,
    pub tool_call_id: String,
    pub chat_id: String,
    pub external_run_id: String,
    pub behavior: Arc<AsyncBehavior>,
    pub status_tool: String,
    pub id_param: String,
    pub interval: Duration,
    pub max_duration: Duration,
    pub cancel: CancellationToken,
    pub generation: u64,
}

impl<E: ToolExecutor, C: Clock> Poller<E, C> {
    pub async fn run(self) {
        let start = Instant::now();
        let deadline = start + self.max_duration;
        let mut ticker = tokio::time::interval_at(start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(tool_call_id = %self.tool_call_id, "poller cancelled");
                    break;
                }
                _ = sleep_until(deadline) => {
                    if self.state.finish(
                        &self.tool_call_id,
                        Some(self.generation),
                        STATUS_TIMEOUT,
                        Some(TIMEOUT_ERROR.to_string()),
                    ) {
                        tracing::info!(
                            tool_call_id = %self.tool_call_id,
                            chat_id = %self.chat_id,
                            after_secs = self.max_duration.as_secs(),
                            "operation timed out"
                        );
                    }
                    break;
                }
                _ = ticker.tick() => {}
            }

            if self.poll_once().await == Step::Stop {
                break;
            }
        }

        self.state
            .store
            .release_cancel(&self.tool_call_id, self.generation);
    }

    async fn poll_once(&self) -> Step {
        let mut arguments = Map::new();
        arguments.insert(
            self.id_param.clone(),
            Value::String(self.external_run_id.clone()),
        );
        let call = ToolCall::new(
            &self.chat_id,
            &self.tool_call_id,
            &self.status_tool,
            Value::Object(arguments),
        );

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Step::Stop,
            result = self.executor.execute(&self.cancel, call) => result,
        };

        match result {
            Ok(execution) => self.handle_execution(execution),
            Err(ExecutorError::Cancelled) => Step::Stop,
            Err(e) => {
                tracing::error!(
                    tool_call_id = %self.tool_call_id,
                    status_tool = %self.status_tool,
                    error = %e,
                    "status poll failed, retrying next tick"
                );
                Step::Continue
            }
        }
    }

    fn handle_execution(&self, execution: ToolExecution) -> Step {
        if execution.is_failed() {
            tracing::error!(
                tool_call_id = %self.tool_call_id,
                status_tool = %self.status_tool,
                error = execution.error_message.as_deref().unwrap_or(""),
                "status tool reported failure, retrying next tick"
            );
            return Step::Continue;
        }

        let text = execution.result.unwrap_or_default();
        let response: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    tool_call_id = %self.tool_call_id,
                    error = %e,
                    "status response is not JSON, retrying next tick"
                );
                return Step::Continue;
            }
        };

        match StatusReport::extract(&self.behavior, &response) {
            Some(report) => self.record(report),
            None => {
                tracing::debug!(tool_call_id = %self.tool_call_id, "inconclusive status response");
                Step::Continue
            }
        }
    }

    /// Fold a report into the record and publish the result.
    ///
    /// A record that was removed, or re-registered under a new generation,
    /// is no longer this poller's to write.
    fn record(&self, report: StatusReport) -> Step {
        let step = self.state.with_gate(&self.tool_call_id, Some(self.generation), || {
            // A stop that raced this poll owns the terminal transition
            if self.cancel.is_cancelled() {
                return Step::Stop;
            }
            let now = self.state.clock.now();
            let applied = self
                .state
                .store
                .mutate(&self.tool_call_id, Some(self.generation), |op| {
                    if op.is_terminal() {
                        return None;
                    }
                    let outcome = op.apply(report, now);
                    Some((outcome, op.clone()))
                })
                .flatten();

            let Some((outcome, snapshot)) = applied else {
                return Step::Stop;
            };
            self.state.publish(&snapshot);

            match outcome {
                Some(outcome) => {
                    tracing::info!(
                        tool_call_id = %self.tool_call_id,
                        chat_id = %self.chat_id,
                        status = %snapshot.status,
                        ?outcome,
                        "operation completed"
                    );
                    Step::Stop
                }
                None => {
                    tracing::trace!(
                        tool_call_id = %self.tool_call_id,
                        status = %snapshot.status,
                        progress = ?snapshot.progress,
                        "operation progressed"
                    );
                    Step::Continue
                }
            }
        });
        step.unwrap_or(Step::Stop)
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;

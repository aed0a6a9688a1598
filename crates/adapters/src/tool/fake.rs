// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake tool executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ExecutorError, ToolCall, ToolExecution, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted reply for one call
#[derive(Debug, Clone)]
enum Reply {
    Execution(ToolExecution),
    Transport(String),
}

impl Reply {
    fn into_result(self) -> Result<ToolExecution, ExecutorError> {
        match self {
            Reply::Execution(execution) => Ok(execution),
            Reply::Transport(message) => Err(ExecutorError::Transport(message)),
        }
    }
}

#[derive(Default)]
struct FakeState {
    /// One-shot replies, consumed in order
    scripted: HashMap<String, VecDeque<Reply>>,
    /// Reply used once a tool's script is exhausted
    fallback: HashMap<String, Reply>,
    calls: Vec<ToolCall>,
    delay: Option<Duration>,
}

/// Fake executor with scripted replies and call recording
#[derive(Clone, Default)]
pub struct FakeToolExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn push(&self, tool: &str, reply: Reply) {
        self.with_state(|state| {
            state
                .scripted
                .entry(tool.to_string())
                .or_default()
                .push_back(reply)
        });
    }

    /// Queue a one-shot execution record for `tool`
    pub fn respond(&self, tool: &str, execution: ToolExecution) {
        self.push(tool, Reply::Execution(execution));
    }

    /// Queue a one-shot completed execution whose output is `value`
    pub fn respond_json(&self, tool: &str, value: Value) {
        self.respond(tool, ToolExecution::json(&value));
    }

    /// Queue a one-shot transport failure for `tool`
    pub fn fail_transport(&self, tool: &str, message: &str) {
        self.push(tool, Reply::Transport(message.to_string()));
    }

    /// Reply used for every call to `tool` once its queue is empty
    pub fn always(&self, tool: &str, execution: ToolExecution) {
        self.with_state(|state| {
            state
                .fallback
                .insert(tool.to_string(), Reply::Execution(execution))
        });
    }

    /// Like [`always`](Self::always) with a JSON output
    pub fn always_json(&self, tool: &str, value: Value) {
        self.always(tool, ToolExecution::json(&value));
    }

    /// Delay every reply, honoring cancellation while waiting
    pub fn set_delay(&self, delay: Duration) {
        self.with_state(|state| state.delay = Some(delay));
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ToolCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Recorded calls to one tool
    pub fn calls_to(&self, tool: &str) -> Vec<ToolCall> {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter(|call| call.tool_name == tool)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl ToolExecutor for FakeToolExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        call: ToolCall,
    ) -> Result<ToolExecution, ExecutorError> {
        let (reply, delay) = self.with_state(|state| {
            state.calls.push(call.clone());
            let reply = state
                .scripted
                .get_mut(&call.tool_name)
                .and_then(VecDeque::pop_front)
                .or_else(|| state.fallback.get(&call.tool_name).cloned());
            (reply, state.delay)
        });

        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match reply {
            Some(reply) => reply.into_result(),
            None => Err(ExecutorError::UnknownTool(call.tool_name)),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

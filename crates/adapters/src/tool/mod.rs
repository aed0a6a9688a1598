// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool execution adapters
//!
//! The tracker never talks to external systems directly. Status and cancel
//! tools are invoked by name through a [`ToolExecutor`], which owns its own
//! transport, timeouts and retries.

mod process;

pub use process::{ProcessToolExecutor, ToolCommand, DEFAULT_TOOL_TIMEOUT};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeToolExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from executing a tool
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("failed to start tool {tool}: {message}")]
    SpawnFailed { tool: String, message: String },
    #[error("tool {tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
    #[error("tool call cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub chat_id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(
        chat_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Outcome reported by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

/// Record returned from a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub status: ExecutionStatus,
    /// Raw tool output; JSON text for status tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolExecution {
    pub fn completed(result: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            result: Some(result.into()),
            error_message: None,
        }
    }

    /// Completed execution whose output is the given JSON value
    pub fn json(value: &Value) -> Self {
        Self::completed(value.to_string())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            result: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }
}

/// Adapter that runs named tools on behalf of the tracker
#[async_trait]
pub trait ToolExecutor: Clone + Send + Sync + 'static {
    /// Run a tool to completion.
    ///
    /// Implementations must stop promptly once `cancel` fires.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        call: ToolCall,
    ) -> Result<ToolExecution, ExecutorError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process tool executor
//!
//! Each tool name maps to a command. The call's arguments are written to the
//! child's stdin as JSON; stdout becomes the result on a zero exit, stderr
//! becomes the error message otherwise.

use super::{ExecutorError, ToolCall, ToolExecution, ToolExecutor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Time a tool process may run when its config does not say otherwise
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

fn default_timeout() -> Duration {
    DEFAULT_TOOL_TIMEOUT
}

/// Command bound to a tool name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl ToolCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executor that runs tools as local processes
#[derive(Clone, Default)]
pub struct ProcessToolExecutor {
    tools: Arc<HashMap<String, ToolCommand>>,
}

impl ProcessToolExecutor {
    pub fn new(tools: HashMap<String, ToolCommand>) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    async fn run(tool: &ToolCommand, call: &ToolCall) -> Result<ToolExecution, ExecutorError> {
        let mut child = Command::new(&tool.command)
            .args(&tool.args)
            .env("TW_TOOL_NAME", &call.tool_name)
            .env("TW_TOOL_CALL_ID", &call.tool_call_id)
            .env("TW_CHAT_ID", &call.chat_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::SpawnFailed {
                tool: call.tool_name.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&call.arguments)
                .map_err(|e| ExecutorError::Transport(e.to_string()))?;
            // A tool that ignores its input may exit before reading it
            if let Err(e) = stdin.write_all(&payload).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(ToolExecution::completed(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", call.tool_name, output.status)
            } else {
                stderr
            };
            Ok(ToolExecution::failed(message))
        }
    }
}

#[async_trait]
impl ToolExecutor for ProcessToolExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        call: ToolCall,
    ) -> Result<ToolExecution, ExecutorError> {
        let tool = self
            .tools
            .get(&call.tool_name)
            .ok_or_else(|| ExecutorError::UnknownTool(call.tool_name.clone()))?;

        // Dropping the run future drops the child, which kills it
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
            _ = tokio::time::sleep(tool.timeout) => Err(ExecutorError::Timeout {
                tool: call.tool_name.clone(),
                after: tool.timeout,
            }),
            result = Self::run(tool, &call) => result,
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

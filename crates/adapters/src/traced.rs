// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::tool::{ExecutionStatus, ExecutorError, ToolCall, ToolExecution, ToolExecutor};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wrapper that adds tracing to any ToolExecutor
#[derive(Clone)]
pub struct TracedToolExecutor<E> {
    inner: E,
}

impl<E> TracedToolExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: ToolExecutor> ToolExecutor for TracedToolExecutor<E> {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        call: ToolCall,
    ) -> Result<ToolExecution, ExecutorError> {
        let span = tracing::info_span!(
            "tool.execute",
            tool = %call.tool_name,
            tool_call_id = %call.tool_call_id,
            chat_id = %call.chat_id,
        );

        async move {
            tracing::debug!("starting");

            let start = std::time::Instant::now();
            let result = self.inner.execute(cancel, call).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(execution) => match execution.status {
                    ExecutionStatus::Completed => tracing::debug!(
                        elapsed_ms,
                        result_len = execution.result.as_ref().map(String::len),
                        "completed"
                    ),
                    ExecutionStatus::Failed => tracing::warn!(
                        elapsed_ms,
                        error = execution.error_message.as_deref().unwrap_or(""),
                        "tool reported failure"
                    ),
                },
                // Cancellation is a normal way for a call to end
                Err(ExecutorError::Cancelled) => tracing::debug!(elapsed_ms, "cancelled"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "execution failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

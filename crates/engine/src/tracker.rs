// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker facade
//!
//! Entry point for registering asynchronous tool calls, stopping or
//! cancelling them, reading their state and subscribing to their events.

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::poller::Poller;
use crate::registry::{CompletionReceiver, SubscriberRegistry, Subscription};
use crate::state::{SharedState, TrackerState};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tw_adapters::{ToolCall, ToolExecutor};
use tw_core::{
    path, AsyncBehavior, BehaviorError, Clock, IdGen, Operation, SubscriptionId, STATUS_CANCELLED,
};

/// Registration request for one asynchronous tool call
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub tool_call_id: String,
    pub chat_id: String,
    pub tool_name: String,
    pub scenario: String,
    /// Synchronous result of the originating tool
    pub tool_result: Value,
    pub behavior: Option<Arc<AsyncBehavior>>,
}

impl TrackRequest {
    pub fn new(
        tool_call_id: impl Into<String>,
        chat_id: impl Into<String>,
        tool_result: Value,
        behavior: Arc<AsyncBehavior>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            chat_id: chat_id.into(),
            tool_name: String::new(),
            scenario: String::new(),
            tool_result,
            behavior: Some(behavior),
        }
    }

    pub fn tool(mut self, tool_name: impl Into<String>, scenario: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self.scenario = scenario.into();
        self
    }
}

/// Tracks asynchronous tool executions and fans out their progress
pub struct Tracker<E, C: Clock, I: IdGen> {
    state: SharedState<C>,
    executor: E,
    id_gen: I,
    config: Arc<TrackerConfig>,
}

impl<E: Clone, C: Clock, I: IdGen> Clone for Tracker<E, C, I> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            executor: self.executor.clone(),
            id_gen: self.id_gen.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<E, C, I> Tracker<E, C, I>
where
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    pub fn new(executor: E, clock: C, id_gen: I, config: TrackerConfig) -> Self {
        let registry =
            SubscriberRegistry::new(config.subscription_capacity, config.completion_capacity);
        Self {
            state: Arc::new(TrackerState::new(registry, clock)),
            executor,
            id_gen,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Register an asynchronous tool call and start polling it.
    ///
    /// The poller runs on the current tokio runtime and is cancelled with
    /// `scope`. Returns the initial record.
    pub fn start_tracking(
        &self,
        scope: &CancellationToken,
        request: TrackRequest,
    ) -> Result<Operation, TrackerError> {
        let TrackRequest {
            tool_call_id,
            chat_id,
            tool_name,
            scenario,
            tool_result,
            behavior,
        } = request;

        let behavior = behavior.ok_or(BehaviorError::Missing)?;
        let polling = behavior.polling()?;
        let external_run_id = operation_id(&tool_result, &polling.operation_id_field).ok_or_else(
            || TrackerError::MissingOperationId {
                field: polling.operation_id_field.clone(),
            },
        )?;

        let operation = Operation::new(
            &tool_call_id,
            &chat_id,
            &external_run_id,
            Arc::clone(&behavior),
            self.state.clock.now(),
        )
        .with_tool(&tool_name, &scenario);

        let cancel = scope.child_token();
        let generation = self.state.store.insert(operation.clone(), cancel.clone())?;

        // Initial update goes out before the poller can publish anything
        self.state.with_gate(&tool_call_id, Some(generation), || {
            if let Some(current) = self.state.store.snapshot(&tool_call_id) {
                if !current.is_terminal() {
                    self.state.registry.publish(&current.to_update());
                }
            }
        });

        let poller = Poller {
            state: Arc::clone(&self.state),
            executor: self.executor.clone(),
            tool_call_id: tool_call_id.clone(),
            chat_id: chat_id.clone(),
            external_run_id: external_run_id.clone(),
            status_tool: polling.status_tool.clone(),
            id_param: polling.status_tool_id_param.clone(),
            interval: polling.poll_interval(),
            max_duration: polling.max_poll_duration(),
            behavior,
            cancel,
            generation,
        };
        tokio::spawn(poller.run());

        tracing::info!(
            %tool_call_id,
            %chat_id,
            tool = %tool_name,
            %external_run_id,
            "tracking started"
        );
        Ok(operation)
    }

    /// Stop polling and mark the operation cancelled.
    ///
    /// Returns whether this call made the terminal transition; repeated
    /// calls and unknown ids return `false`.
    pub fn stop_tracking(&self, tool_call_id: &str) -> bool {
        if let Some(cancel) = self.state.store.take_cancel(tool_call_id) {
            cancel.cancel();
        }
        let stopped = self.state.finish(tool_call_id, None, STATUS_CANCELLED, None);
        if stopped {
            tracing::info!(tool_call_id, "operation cancelled");
        }
        stopped
    }

    /// Ask the remote side to cancel, then stop tracking locally.
    ///
    /// A failed cancel tool leaves the operation untouched.
    pub async fn cancel_operation(
        &self,
        scope: &CancellationToken,
        tool_call_id: &str,
    ) -> Result<(), TrackerError> {
        let operation = self
            .state
            .store
            .snapshot(tool_call_id)
            .ok_or_else(|| TrackerError::NotFound(tool_call_id.to_string()))?;
        let binding = operation
            .behavior
            .cancellation
            .as_ref()
            .ok_or_else(|| TrackerError::CancellationNotConfigured(tool_call_id.to_string()))?;

        if operation.is_terminal() {
            tracing::debug!(tool_call_id, status = %operation.status, "already terminal, skipping cancel tool");
            return Ok(());
        }

        let mut arguments = Map::new();
        arguments.insert(
            binding.cancel_tool_id_param.clone(),
            Value::String(operation.external_run_id.clone()),
        );
        let call = ToolCall::new(
            &operation.chat_id,
            tool_call_id,
            &binding.cancel_tool,
            Value::Object(arguments),
        );

        let failure = match self.executor.execute(scope, call).await {
            Ok(execution) if execution.is_failed() => Some(
                execution
                    .error_message
                    .unwrap_or_else(|| "cancel tool failed".to_string()),
            ),
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        if let Some(message) = failure {
            tracing::error!(
                tool_call_id,
                cancel_tool = %binding.cancel_tool,
                error = %message,
                "remote cancel failed"
            );
            return Err(TrackerError::CancelFailed {
                tool: binding.cancel_tool.clone(),
                message,
            });
        }

        self.stop_tracking(tool_call_id);
        Ok(())
    }

    pub fn get_operation(&self, tool_call_id: &str) -> Option<Operation> {
        self.state.store.snapshot(tool_call_id)
    }

    /// Non-terminal operations of one chat
    pub fn get_active_operations(&self, chat_id: &str) -> Vec<Operation> {
        self.state
            .store
            .list_for_chat(chat_id)
            .into_iter()
            .filter(|op| !op.is_terminal())
            .collect()
    }

    /// Every operation of one chat, terminal ones included
    pub fn operations_for_chat(&self, chat_id: &str) -> Vec<Operation> {
        self.state.store.list_for_chat(chat_id)
    }

    pub fn list_operations(&self) -> Vec<Operation> {
        self.state.store.list()
    }

    pub fn operation_count(&self) -> usize {
        self.state.store.len()
    }

    pub fn subscribe(&self, chat_id: &str) -> Subscription {
        let subscription = self.state.registry.subscribe(self.id_gen.next(), chat_id);
        tracing::debug!(subscription_id = %subscription.id, chat_id, "subscribed");
        subscription
    }

    /// Close a subscription; unknown ids are ignored
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.state.registry.unsubscribe(id)
    }

    /// Open the completion queue of a chat, replacing any previous one
    pub fn register_completion_callback(&self, chat_id: &str) -> CompletionReceiver {
        self.state.registry.register_completion(chat_id)
    }

    pub fn unregister_completion_callback(&self, chat_id: &str) -> bool {
        self.state.registry.unregister_completion(chat_id)
    }

    pub fn subscriber_count(&self, chat_id: &str) -> usize {
        self.state.registry.subscriber_count(chat_id)
    }

    pub fn has_completion_callback(&self, chat_id: &str) -> bool {
        self.state.registry.has_completion(chat_id)
    }

    /// Drop terminal operations that completed more than `retain` ago.
    ///
    /// Returns how many were removed.
    pub fn cleanup_stale_operations(&self, retain: Duration) -> usize {
        let retain = chrono::Duration::from_std(retain).unwrap_or(chrono::Duration::MAX);
        let cutoff = self
            .state
            .clock
            .now()
            .checked_sub_signed(retain)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.state.store.remove_completed_before(cutoff);
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), %cutoff, "removed stale operations");
        }
        removed.len()
    }

    /// Delete a record without cancelling its poller.
    ///
    /// The poller notices the missing record on its next report and exits.
    pub fn remove_operation(&self, tool_call_id: &str) -> Option<Operation> {
        let removed = self.state.store.remove(tool_call_id);
        if removed.is_some() {
            tracing::debug!(tool_call_id, "operation removed");
        }
        removed
    }

    /// Run the retention sweep every `interval` until `cancel` fires
    pub fn spawn_retention_sweeper(
        &self,
        interval: Duration,
        retain: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let tracker = self.clone();
        let interval = interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracker.cleanup_stale_operations(retain);
                    }
                }
            }
            tracing::debug!("retention sweeper stopped");
        })
    }

    /// Cancel every live poller; records keep their current state
    pub fn shutdown(&self) -> usize {
        let cancels = self.state.store.take_all_cancels();
        for cancel in &cancels {
            cancel.cancel();
        }
        tracing::info!(pollers = cancels.len(), "tracker shut down");
        cancels.len()
    }
}

/// External run id at `field` in the originating tool result.
///
/// Strings are taken as-is and numbers in their JSON form; empty strings
/// count as absent.
fn operation_id(tool_result: &Value, field: &str) -> Option<String> {
    match path::lookup(tool_result, field)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;

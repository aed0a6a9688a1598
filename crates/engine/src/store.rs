// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory operation store
//!
//! Maps `tool_call_id` to the operation record plus the poller's cancel
//! handle. Every read hands out a copy; writers go through [`OperationStore::mutate`]
//! so a record is never observed half-updated.

use crate::error::TrackerError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tw_core::Operation;

/// Serializes "mutate, then publish" for a single operation.
///
/// Held across non-blocking sends only.
pub type EmitGate = Arc<Mutex<()>>;

struct Entry {
    operation: Operation,
    cancel: Option<CancellationToken>,
    generation: u64,
    gate: EmitGate,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

/// Concurrent map of tracked operations
#[derive(Default)]
pub struct OperationStore {
    inner: RwLock<Inner>,
}

impl OperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a new record with its poller's cancel handle.
    ///
    /// Returns the entry's generation, which the poller presents when it
    /// releases the handle so a re-registered id is never disturbed.
    pub fn insert(
        &self,
        operation: Operation,
        cancel: CancellationToken,
    ) -> Result<u64, TrackerError> {
        let mut inner = self.write();
        if inner.entries.contains_key(&operation.tool_call_id) {
            return Err(TrackerError::Duplicate(operation.tool_call_id));
        }
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.entries.insert(
            operation.tool_call_id.clone(),
            Entry {
                operation,
                cancel: Some(cancel),
                generation,
                gate: EmitGate::default(),
            },
        );
        Ok(generation)
    }

    /// Copy of one record
    pub fn snapshot(&self, tool_call_id: &str) -> Option<Operation> {
        self.read()
            .entries
            .get(tool_call_id)
            .map(|entry| entry.operation.clone())
    }

    /// Run `f` against a record under the write lock.
    ///
    /// With `Some(generation)` the record must be the one registered under
    /// that generation; a removed or re-registered entry counts as missing.
    pub fn mutate<R>(
        &self,
        tool_call_id: &str,
        generation: Option<u64>,
        f: impl FnOnce(&mut Operation) -> R,
    ) -> Option<R> {
        self.write()
            .entries
            .get_mut(tool_call_id)
            .filter(|entry| generation.map_or(true, |g| g == entry.generation))
            .map(|entry| f(&mut entry.operation))
    }

    /// Emit gate of one record, subject to the same generation check as
    /// [`OperationStore::mutate`]
    pub fn gate(&self, tool_call_id: &str, generation: Option<u64>) -> Option<EmitGate> {
        self.read()
            .entries
            .get(tool_call_id)
            .filter(|entry| generation.map_or(true, |g| g == entry.generation))
            .map(|entry| Arc::clone(&entry.gate))
    }

    /// Detach the cancel handle so the caller can invoke it
    pub fn take_cancel(&self, tool_call_id: &str) -> Option<CancellationToken> {
        self.write()
            .entries
            .get_mut(tool_call_id)
            .and_then(|entry| entry.cancel.take())
    }

    /// Drop the cancel handle of an exiting poller.
    ///
    /// No-op when the entry was removed or replaced since `generation`.
    pub fn release_cancel(&self, tool_call_id: &str, generation: u64) {
        if let Some(entry) = self.write().entries.get_mut(tool_call_id) {
            if entry.generation == generation {
                entry.cancel = None;
            }
        }
    }

    /// Whether a poller handle is still registered for the record
    pub fn is_polling(&self, tool_call_id: &str) -> bool {
        self.read()
            .entries
            .get(tool_call_id)
            .is_some_and(|entry| entry.cancel.is_some())
    }

    /// Delete a record together with its cancel handle.
    ///
    /// The handle is dropped without being invoked.
    pub fn remove(&self, tool_call_id: &str) -> Option<Operation> {
        self.write()
            .entries
            .remove(tool_call_id)
            .map(|entry| entry.operation)
    }

    /// Delete every terminal record that completed before `cutoff`
    pub fn remove_completed_before(&self, cutoff: DateTime<Utc>) -> Vec<Operation> {
        let mut inner = self.write();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.operation.completed_before(cutoff))
            .map(|(id, _)| id.clone())
            .collect();
        stale
            .iter()
            .filter_map(|id| inner.entries.remove(id))
            .map(|entry| entry.operation)
            .collect()
    }

    /// Copies of all records, oldest first
    pub fn list(&self) -> Vec<Operation> {
        self.collect(|_| true)
    }

    /// Copies of one chat's records, oldest first
    pub fn list_for_chat(&self, chat_id: &str) -> Vec<Operation> {
        self.collect(|op| op.chat_id == chat_id)
    }

    fn collect(&self, keep: impl Fn(&Operation) -> bool) -> Vec<Operation> {
        let mut ops: Vec<Operation> = self
            .read()
            .entries
            .values()
            .map(|entry| &entry.operation)
            .filter(|op| keep(op))
            .cloned()
            .collect();
        ops.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.tool_call_id.cmp(&b.tool_call_id))
        });
        ops
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detach every cancel handle still registered
    pub fn take_all_cancels(&self) -> Vec<CancellationToken> {
        self.write()
            .entries
            .values_mut()
            .filter_map(|entry| entry.cancel.take())
            .collect()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

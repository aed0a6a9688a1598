// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State shared by the tracker facade and its pollers

use crate::registry::SubscriberRegistry;
use crate::store::OperationStore;
use std::sync::{Arc, MutexGuard};
use tw_core::{Clock, Operation};

pub(crate) struct TrackerState<C: Clock> {
    pub store: OperationStore,
    pub registry: SubscriberRegistry,
    pub clock: C,
}

impl<C: Clock> TrackerState<C> {
    pub fn new(registry: SubscriberRegistry, clock: C) -> Self {
        Self {
            store: OperationStore::new(),
            registry,
            clock,
        }
    }

    /// Deliver a record snapshot: the update first, then the completion
    /// event when the snapshot is terminal.
    ///
    /// Callers hold the operation's emit gate.
    pub fn publish(&self, snapshot: &Operation) {
        self.registry.publish(&snapshot.to_update());
        if snapshot.is_terminal() {
            self.registry.publish_completion(&snapshot.to_completion());
        }
    }

    /// Run `f` with the operation's emit gate held.
    ///
    /// Returns `None` when the operation is not in the store, or when
    /// `generation` is given and the entry was re-registered since.
    pub fn with_gate<R>(
        &self,
        tool_call_id: &str,
        generation: Option<u64>,
        f: impl FnOnce() -> R,
    ) -> Option<R> {
        let gate = self.store.gate(tool_call_id, generation)?;
        let _emitting: MutexGuard<'_, ()> = gate.lock().unwrap_or_else(|e| e.into_inner());
        Some(f())
    }

    /// Move an operation to a terminal status and publish it.
    ///
    /// Pollers pass their generation so they only ever finish their own
    /// record. Returns whether this call performed the transition.
    pub fn finish(
        &self,
        tool_call_id: &str,
        generation: Option<u64>,
        status: &str,
        error: Option<String>,
    ) -> bool {
        self.with_gate(tool_call_id, generation, || {
            let now = self.clock.now();
            let snapshot = self
                .store
                .mutate(tool_call_id, generation, |op| {
                    op.finish(status, error, now).then(|| op.clone())
                })
                .flatten();
            match snapshot {
                Some(snapshot) => {
                    self.publish(&snapshot);
                    true
                }
                None => false,
            }
        })
        .unwrap_or(false)
    }
}

pub(crate) type SharedState<C> = Arc<TrackerState<C>>;

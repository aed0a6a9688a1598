// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber registry
//!
//! Per-chat fan-out of operation updates and completion events over
//! bounded queues. Publishing never blocks: a full queue loses the event
//! for that receiver only.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tw_core::{CompletionEvent, OperationUpdate, SubscriptionId};

/// Receiving end of a chat subscription
pub type UpdateReceiver = mpsc::Receiver<OperationUpdate>;
/// Receiving end of a chat's completion queue
pub type CompletionReceiver = mpsc::Receiver<CompletionEvent>;

/// Handle returned by [`SubscriberRegistry::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub chat_id: String,
    pub receiver: UpdateReceiver,
}

impl Subscription {
    /// Next update; `None` once unsubscribed and drained
    pub async fn recv(&mut self) -> Option<OperationUpdate> {
        self.receiver.recv().await
    }
}

#[derive(Default)]
struct Inner {
    /// chat id -> live subscriptions, in subscribe order
    subscribers: HashMap<String, Vec<(SubscriptionId, mpsc::Sender<OperationUpdate>)>>,
    /// subscription id -> chat id
    chats: HashMap<SubscriptionId, String>,
    completions: HashMap<String, mpsc::Sender<CompletionEvent>>,
}

impl Inner {
    fn drop_subscription(&mut self, id: &SubscriptionId) -> bool {
        let Some(chat_id) = self.chats.remove(id) else {
            return false;
        };
        if let Some(subs) = self.subscribers.get_mut(&chat_id) {
            subs.retain(|(sub_id, _)| sub_id != id);
            if subs.is_empty() {
                self.subscribers.remove(&chat_id);
            }
        }
        true
    }
}

/// Chat-keyed fan-out of tracker events
pub struct SubscriberRegistry {
    inner: RwLock<Inner>,
    subscription_capacity: usize,
    completion_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(subscription_capacity: usize, completion_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            subscription_capacity: subscription_capacity.max(1),
            completion_capacity: completion_capacity.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a new update queue for `chat_id`
    pub fn subscribe(&self, id: SubscriptionId, chat_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.subscription_capacity);
        let mut inner = self.write();
        inner.drop_subscription(&id);
        inner.chats.insert(id.clone(), chat_id.to_string());
        inner
            .subscribers
            .entry(chat_id.to_string())
            .or_default()
            .push((id.clone(), tx));
        Subscription {
            id,
            chat_id: chat_id.to_string(),
            receiver: rx,
        }
    }

    /// Close a subscription's queue; unknown ids are ignored
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.write().drop_subscription(id)
    }

    /// Install the completion queue for `chat_id`, closing any previous one
    pub fn register_completion(&self, chat_id: &str) -> CompletionReceiver {
        let (tx, rx) = mpsc::channel(self.completion_capacity);
        let replaced = self
            .write()
            .completions
            .insert(chat_id.to_string(), tx)
            .is_some();
        if replaced {
            tracing::debug!(chat_id, "completion callback replaced");
        }
        rx
    }

    pub fn unregister_completion(&self, chat_id: &str) -> bool {
        self.write().completions.remove(chat_id).is_some()
    }

    /// Offer an update to every subscription of its chat.
    ///
    /// Returns how many queues accepted it.
    pub fn publish(&self, update: &OperationUpdate) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let inner = self.read();
            let Some(subs) = inner.subscribers.get(&update.chat_id) else {
                return 0;
            };
            for (id, tx) in subs {
                match tx.try_send(update.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            subscription_id = %id,
                            chat_id = %update.chat_id,
                            tool_call_id = %update.tool_call_id,
                            status = %update.status,
                            "subscriber queue full, dropping update"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(id.clone()),
                }
            }
        }

        if !closed.is_empty() {
            let mut inner = self.write();
            for id in &closed {
                inner.drop_subscription(id);
            }
            tracing::debug!(count = closed.len(), "pruned closed subscriptions");
        }
        delivered
    }

    /// Offer a completion event to its chat's completion queue
    pub fn publish_completion(&self, event: &CompletionEvent) -> bool {
        let result = {
            let inner = self.read();
            let Some(tx) = inner.completions.get(&event.chat_id) else {
                return false;
            };
            tx.try_send(event.clone())
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    chat_id = %event.chat_id,
                    tool_call_id = %event.tool_call_id,
                    status = %event.status,
                    "completion queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                let mut inner = self.write();
                if inner
                    .completions
                    .get(&event.chat_id)
                    .is_some_and(|tx| tx.is_closed())
                {
                    inner.completions.remove(&event.chat_id);
                }
                false
            }
        }
    }

    pub fn subscriber_count(&self, chat_id: &str) -> usize {
        self.read().subscribers.get(chat_id).map_or(0, Vec::len)
    }

    pub fn subscription_total(&self) -> usize {
        self.read().chats.len()
    }

    pub fn has_completion(&self, chat_id: &str) -> bool {
        self.read().completions.contains_key(chat_id)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_SUBSCRIPTION_CAPACITY,
            crate::config::DEFAULT_COMPLETION_CAPACITY,
        )
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

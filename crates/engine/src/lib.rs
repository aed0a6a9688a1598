// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! toolwatch tracking engine
//!
//! Operation store, subscriber fan-out and one status poller per tracked
//! operation, behind the [`Tracker`] facade.

mod config;
mod error;
mod poller;
mod registry;
mod state;
mod store;
mod tracker;

pub use config::{
    TrackerConfig, DEFAULT_COMPLETION_CAPACITY, DEFAULT_SUBSCRIPTION_CAPACITY,
    DEFAULT_SWEEP_INTERVAL,
};
pub use error::{ErrorKind, TrackerError};
pub use registry::{CompletionReceiver, SubscriberRegistry, Subscription, UpdateReceiver};
pub use store::OperationStore;
pub use tracker::{TrackRequest, Tracker};

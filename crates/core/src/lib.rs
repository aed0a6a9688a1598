// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-core: pure types for the toolwatch tracker
//!
//! This crate provides:
//! - Dotted-path lookups into schema-less tool output
//! - Async behavior configuration and status-report extraction
//! - The tracked operation record and the events derived from it
//! - Clock and id-generator abstractions for deterministic tests

pub mod behavior;
pub mod clock;
pub mod event;
pub mod id;
pub mod operation;
pub mod path;
pub mod report;

pub use behavior::{
    AsyncBehavior, BehaviorError, CancellationBinding, CompletionConditions, Outcome,
    ProgressTracking, StatusPolling,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{CompletionEvent, OperationUpdate};
pub use id::{IdGen, SequentialIdGen, SubscriptionId, UuidIdGen};
pub use operation::{
    Operation, STATUS_CANCELLED, STATUS_PENDING, STATUS_TIMEOUT, TIMEOUT_ERROR,
};
pub use report::StatusReport;

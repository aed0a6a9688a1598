//! Behavioral specifications for the toolwatch tracker.
//!
//! These tests are black-box: they drive the public `tw_engine::Tracker` API
//! with scripted tool responses and verify the stored records and the events
//! published to subscribers and completion callbacks.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// tracking/
#[path = "specs/tracking/cancellation.rs"]
mod tracking_cancellation;
#[path = "specs/tracking/completion.rs"]
mod tracking_completion;
#[path = "specs/tracking/retention.rs"]
mod tracking_retention;
#[path = "specs/tracking/start.rs"]
mod tracking_start;
#[path = "specs/tracking/timeout.rs"]
mod tracking_timeout;

// events/
#[path = "specs/events/subscriptions.rs"]
mod events_subscriptions;

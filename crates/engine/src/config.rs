// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffered updates per subscription before new ones are dropped
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 100;
/// Buffered completion events per chat
pub const DEFAULT_COMPLETION_CAPACITY: usize = 10;
/// Cadence of the background retention sweep
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

fn default_subscription_capacity() -> usize {
    DEFAULT_SUBSCRIPTION_CAPACITY
}

fn default_completion_capacity() -> usize {
    DEFAULT_COMPLETION_CAPACITY
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

/// Resource bounds and retention for a tracker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_subscription_capacity")]
    pub subscription_capacity: usize,
    #[serde(default = "default_completion_capacity")]
    pub completion_capacity: usize,
    /// How long terminal operations are kept; `None` keeps them until removed
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub retention: Option<Duration>,
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
            completion_capacity: DEFAULT_COMPLETION_CAPACITY,
            retention: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! toolwatch daemon library
//!
//! Config loading, socket lifecycle, and the wire protocol shared with the
//! `tw` CLI.

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use config::{default_socket_path, Config};
pub use lifecycle::{DaemonState, LifecycleError};
pub use protocol::{ProtocolError, Request, Response};

/// Startup marker prefix written to log before anything else.
/// Full format: "--- twd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- twd: starting (pid: ";

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tw_adapters::{ProcessToolExecutor, TracedToolExecutor};
use tw_core::{SystemClock, UuidIdGen};
use tw_engine::Tracker;

pub use crate::config::Config;
use crate::server::ServerContext;

/// Executor used by the daemon: configured local tools, wrapped with tracing
pub type DaemonExecutor = TracedToolExecutor<ProcessToolExecutor>;

/// Tracker with the daemon's concrete collaborators
pub type DaemonTracker = Tracker<DaemonExecutor, SystemClock, UuidIdGen>;

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub tracker: DaemonTracker,
    /// Fires on shutdown; parent scope of every poller and stream
    pub shutdown: CancellationToken,
    /// When daemon started
    pub start_time: Instant,
    sweeper: Option<JoinHandle<()>>,
}

impl DaemonState {
    /// Shared handles for connection tasks
    pub fn context(&self) -> ServerContext<DaemonExecutor, SystemClock, UuidIdGen> {
        ServerContext::new(self.tracker.clone(), self.shutdown.clone(), self.start_time)
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.shutdown.cancel();
        self.tracker.shutdown();
        if let Some(sweeper) = self.sweeper.take() {
            if let Err(e) = sweeper.await {
                warn!("Retention sweeper ended abnormally: {}", e);
            }
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // Files belong to the daemon that holds the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    for path in [&config.socket_path, &config.lock_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire lock file FIRST - prevents races
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Set up the tracker
    let executor = TracedToolExecutor::new(ProcessToolExecutor::new(config.tools.clone()));
    let tracker = Tracker::new(executor, SystemClock, UuidIdGen, config.tracker.clone());
    let shutdown = CancellationToken::new();

    let mut tools: Vec<_> = config.tools.keys().map(String::as_str).collect();
    tools.sort_unstable();
    info!(tools = ?tools, "configured tools");

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 5. Background retention, only when configured
    let sweeper = config.tracker.retention.map(|retain| {
        info!(
            retain_secs = retain.as_secs(),
            every_secs = config.tracker.sweep_interval.as_secs(),
            "retention sweeper enabled"
        );
        tracker.spawn_retention_sweeper(
            config.tracker.sweep_interval,
            retain,
            shutdown.child_token(),
        )
    });

    info!("Daemon started, socket {}", config.socket_path.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        tracker,
        shutdown,
        start_time: Instant::now(),
        sweeper,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

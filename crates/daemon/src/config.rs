// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file (`twd.toml`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tw_adapters::ToolCommand;
use tw_engine::TrackerConfig;

use crate::lifecycle::LifecycleError;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TW_CONFIG";

/// Environment variable overriding the socket directory
pub const SOCKET_DIR_ENV: &str = "TW_SOCKET_DIR";

/// On-disk shape; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    #[serde(default)]
    tracker: TrackerConfig,
    #[serde(default)]
    tools: HashMap<String, ToolCommand>,
}

/// Resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub tracker: TrackerConfig,
    /// Tool name to local command
    pub tools: HashMap<String, ToolCommand>,
}

impl Config {
    /// Load from `path`, or `$TW_CONFIG`, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => Self::from_file(FileConfig::default()),
        }
    }

    /// Parse a config file body, filling unset paths with defaults
    pub fn from_toml(text: &str) -> Result<Self, LifecycleError> {
        let file: FileConfig = toml::from_str(text)?;
        Self::from_file(file)
    }

    fn from_file(file: FileConfig) -> Result<Self, LifecycleError> {
        let state_dir = state_dir();
        let resolve = |explicit: Option<PathBuf>, name: &str| -> Result<PathBuf, LifecycleError> {
            match explicit {
                Some(path) => Ok(path),
                None => Ok(state_dir.as_ref().ok_or(LifecycleError::NoStateDir)?.join(name)),
            }
        };

        Ok(Self {
            socket_path: file
                .socket_path
                .unwrap_or_else(|| socket_dir().join("twd.sock")),
            lock_path: resolve(file.lock_path, "twd.pid")?,
            log_path: resolve(file.log_path, "twd.log")?,
            tracker: file.tracker,
            tools: file.tools,
        })
    }
}

/// State directory for tw: `$XDG_STATE_HOME/tw` or `~/.local/state/tw`
pub fn state_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("tw"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/tw"))
}

/// Socket directory for tw
///
/// Uses /tmp/tw by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with TW_SOCKET_DIR for testing.
pub fn socket_dir() -> PathBuf {
    std::env::var_os(SOCKET_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp/tw"))
}

/// Default socket path, shared with the CLI
pub fn default_socket_path() -> PathBuf {
    socket_dir().join("twd.sock")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

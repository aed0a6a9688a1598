// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use std::fmt;
use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tw_daemon::Config;

use crate::client::{self, ClientError, DaemonClient};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
}

#[derive(Serialize)]
struct StatusReport {
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<usize>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.running {
            return write!(f, "Daemon not running");
        }
        writeln!(f, "Daemon running")?;
        if let Some(version) = &self.version {
            writeln!(f, "  Version: {}", version)?;
        }
        if let Some(uptime) = self.uptime_secs {
            writeln!(f, "  Uptime: {}", format_uptime(uptime))?;
        }
        write!(
            f,
            "  Operations: {} ({} active)",
            self.operations.unwrap_or(0),
            self.active.unwrap_or(0)
        )
    }
}

fn format_uptime(secs: u64) -> String {
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}

pub async fn handle(
    command: DaemonCommand,
    config_path: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            let client = client::daemon_start(config_path, config)?;
            let version = client.hello().await?;
            println!("Daemon running (version {})", version);
        }
        DaemonCommand::Stop => {
            if client::daemon_stop(&config.socket_path).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }
        DaemonCommand::Status => {
            let report = match DaemonClient::connect(&config.socket_path) {
                Ok(client) => {
                    let version = client.hello().await?;
                    let status = client.status().await?;
                    StatusReport {
                        running: true,
                        version: Some(version),
                        uptime_secs: Some(status.uptime_secs),
                        operations: Some(status.operations),
                        active: Some(status.active),
                    }
                }
                Err(ClientError::DaemonNotRunning(_)) => StatusReport {
                    running: false,
                    version: None,
                    uptime_secs: None,
                    operations: None,
                    active: None,
                },
                Err(e) => return Err(e.into()),
            };
            output::print(&report, format);
        }
    }
    Ok(())
}

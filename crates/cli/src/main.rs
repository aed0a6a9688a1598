// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw - toolwatch CLI

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, operation, watch};
use tw_daemon::Config;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "tw",
    version,
    about = "toolwatch - Track long-running asynchronous tool executions"
)]
struct Cli {
    /// Daemon config file (defaults to $TW_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Daemon socket path (overrides the config)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tracked operation management
    #[command(alias = "op")]
    Operation(operation::OperationArgs),
    /// Follow live updates for a chat
    Watch(watch::WatchArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }

    match cli.command {
        // Daemon commands manage the connection themselves
        Commands::Daemon(args) => {
            daemon::handle(args.command, cli.config.as_deref(), &config, cli.output).await?
        }
        Commands::Operation(args) => {
            let client = DaemonClient::connect(&config.socket_path)?;
            operation::handle(args.command, &client, cli.output).await?
        }
        Commands::Watch(args) => {
            let client = DaemonClient::connect(&config.socket_path)?;
            watch::handle(args, &client, cli.output).await?
        }
    }

    Ok(())
}

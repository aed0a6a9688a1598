// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation commands

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tw_core::Operation;

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct OperationArgs {
    #[command(subcommand)]
    pub command: OperationCommand,
}

#[derive(Subcommand)]
pub enum OperationCommand {
    /// List tracked operations
    List {
        /// Only operations belonging to this chat
        #[arg(long)]
        chat: Option<String>,
        /// Hide operations that already reached a terminal status
        #[arg(long)]
        active: bool,
    },
    /// Show details of an operation
    Show {
        /// Tool call id
        id: String,
    },
    /// Stop polling and mark the operation cancelled
    Stop {
        /// Tool call id
        id: String,
    },
    /// Ask the external system to cancel, then stop polling
    Cancel {
        /// Tool call id
        id: String,
    },
    /// Forget an operation without cancelling its poller's target
    Remove {
        /// Tool call id
        id: String,
    },
    /// Drop terminal operations that completed before the retention window
    Cleanup {
        /// Retention window (e.g. "1h", "30m")
        #[arg(long, value_parser = humantime::parse_duration, default_value = "1h")]
        older_than: Duration,
    },
}

/// One row in `tw op list`
#[derive(Serialize)]
#[serde(transparent)]
struct OperationRow<'a>(&'a Operation);

impl fmt::Display for OperationRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.0;
        let progress = op
            .progress
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<24} {:<16} {:<20} {:<12} {:>5}",
            output::truncate(&op.tool_call_id, 24),
            output::truncate(&op.chat_id, 16),
            output::truncate(&op.external_run_id, 20),
            output::truncate(&op.status, 12),
            progress
        )
    }
}

pub async fn handle(
    command: OperationCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        OperationCommand::List { chat, active } => {
            let operations = client.list_operations(chat, active).await?;
            if format == OutputFormat::Text {
                if operations.is_empty() {
                    println!("No operations");
                    return Ok(());
                }
                println!(
                    "{:<24} {:<16} {:<20} {:<12} {:>5}",
                    "TOOL CALL", "CHAT", "RUN", "STATUS", "PROG"
                );
            }
            let rows: Vec<_> = operations
                .iter()
                .map(OperationRow)
                .collect();
            output::print_list(&rows, format);
        }
        OperationCommand::Show { id } => match client.get_operation(&id).await? {
            Some(op) => match format {
                OutputFormat::Json => output::print(&ShowOperation(&op), format),
                OutputFormat::Text => println!("{}", ShowOperation(&op)),
            },
            None => anyhow::bail!("operation not found: {}", id),
        },
        OperationCommand::Stop { id } => {
            if client.stop(&id).await? {
                println!("Stopped operation {}", id);
            } else {
                println!("Operation {} was not running", id);
            }
        }
        OperationCommand::Cancel { id } => {
            client.cancel(&id).await?;
            println!("Cancelled operation {}", id);
        }
        OperationCommand::Remove { id } => {
            let count = client.remove(&id).await?;
            if count == 0 {
                anyhow::bail!("operation not found: {}", id);
            }
            println!("Removed operation {}", id);
        }
        OperationCommand::Cleanup { older_than } => {
            let count = client.cleanup(older_than).await?;
            println!("Removed {} stale operation(s)", count);
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(transparent)]
struct ShowOperation<'a>(&'a Operation);

impl fmt::Display for ShowOperation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.0;
        writeln!(f, "Operation: {}", op.tool_call_id)?;
        writeln!(f, "  Chat: {}", op.chat_id)?;
        if !op.tool_name.is_empty() {
            writeln!(f, "  Tool: {}", op.tool_name)?;
        }
        if !op.scenario.is_empty() {
            writeln!(f, "  Scenario: {}", op.scenario)?;
        }
        writeln!(f, "  Run: {}", op.external_run_id)?;
        writeln!(f, "  Status: {}", op.status)?;
        if let Some(progress) = op.progress {
            writeln!(f, "  Progress: {}%", progress)?;
        }
        if let Some(phase) = &op.phase {
            writeln!(f, "  Phase: {}", phase)?;
        }
        if let Some(message) = &op.message {
            writeln!(f, "  Message: {}", message)?;
        }
        if let Some(result) = &op.result {
            writeln!(f, "  Result: {}", result)?;
        }
        if let Some(error) = &op.error {
            writeln!(f, "  Error: {}", error)?;
        }
        writeln!(f, "  Started: {}", op.started_at.to_rfc3339())?;
        write!(f, "  Updated: {}", op.updated_at.to_rfc3339())?;
        if let Some(completed) = op.completed_at {
            write!(f, "\n  Completed: {}", completed.to_rfc3339())?;
        }
        Ok(())
    }
}

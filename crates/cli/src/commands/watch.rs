// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live streams of operation updates and completions

use std::fmt;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tw_core::{CompletionEvent, OperationUpdate};

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct WatchArgs {
    /// Chat whose operations to follow
    pub chat: String,

    /// Follow terminal completions instead of every update
    #[arg(long)]
    pub completions: bool,
}

#[derive(Serialize)]
#[serde(transparent)]
struct UpdateLine(OperationUpdate);

impl fmt::Display for UpdateLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = &self.0;
        write!(f, "{} {:<24} {}", u.updated_at.format("%H:%M:%S"), u.tool_call_id, u.status)?;
        if let Some(progress) = u.progress {
            write!(f, " {}%", progress)?;
        }
        if let Some(phase) = &u.phase {
            write!(f, " [{}]", phase)?;
        }
        if let Some(message) = &u.message {
            write!(f, " {}", message)?;
        }
        if let Some(error) = &u.error {
            write!(f, " error: {}", error)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct CompletionLine(CompletionEvent);

impl fmt::Display for CompletionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.0;
        write!(f, "{:<24} {}", c.tool_call_id, c.status)?;
        if let Some(result) = &c.result {
            write!(f, " {}", result)?;
        }
        if let Some(error) = &c.error {
            write!(f, " error: {}", error)?;
        }
        Ok(())
    }
}

/// Stream until the daemon closes the connection or the user interrupts
pub async fn handle(args: WatchArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    if args.completions {
        let mut stream = client.watch_completions(&args.chat).await?;
        if format == OutputFormat::Text {
            eprintln!("Watching completions for chat {} (Ctrl-C to stop)", args.chat);
        }
        loop {
            tokio::select! {
                next = stream.next_completion() => match next? {
                    Some(event) => output::print_line(&CompletionLine(event), format),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    } else {
        let (subscription_id, mut stream) = client.subscribe(&args.chat).await?;
        if format == OutputFormat::Text {
            eprintln!(
                "Subscribed to chat {} as {} (Ctrl-C to stop)",
                args.chat, subscription_id
            );
        }
        loop {
            tokio::select! {
                next = stream.next_update() => match next? {
                    Some(update) => output::print_line(&UpdateLine(update), format),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the tracker facade

use thiserror::Error;
use tw_core::BehaviorError;

/// Errors returned to callers of the tracker.
///
/// Transient polling failures never show up here; pollers log them and
/// retry on the next tick.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid async behavior: {0}")]
    Config(#[from] BehaviorError),
    #[error("operation id not found at `{field}` in tool result")]
    MissingOperationId { field: String },
    #[error("operation already tracked: {0}")]
    Duplicate(String),
    #[error("operation not found: {0}")]
    NotFound(String),
    #[error("cancellation is not configured for operation {0}")]
    CancellationNotConfigured(String),
    #[error("cancel tool {tool} failed: {message}")]
    CancelFailed { tool: String, message: String },
}

/// Coarse classification of [`TrackerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Duplicate,
    ExternalCancel,
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Config(_)
            | TrackerError::MissingOperationId { .. }
            | TrackerError::CancellationNotConfigured(_) => ErrorKind::Configuration,
            TrackerError::NotFound(_) => ErrorKind::NotFound,
            TrackerError::Duplicate(_) => ErrorKind::Duplicate,
            TrackerError::CancelFailed { .. } => ErrorKind::ExternalCancel,
        }
    }
}

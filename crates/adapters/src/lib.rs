// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external tool execution

pub mod tool;
pub mod traced;

pub use tool::{
    ExecutionStatus, ExecutorError, ProcessToolExecutor, ToolCall, ToolCommand, ToolExecution,
    ToolExecutor, DEFAULT_TOOL_TIMEOUT,
};
pub use traced::TracedToolExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use tool::FakeToolExecutor;

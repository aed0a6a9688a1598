// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tw_core::{CompletionEvent, Operation, OperationUpdate, SubscriptionId};
use tw_daemon::protocol::{self, ProtocolError};
use tw_daemon::{Config, Request, Response, STARTUP_MARKER_PREFIX};

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("TW_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout waiting for a freshly spawned daemon's socket
pub fn timeout_connect() -> Duration {
    parse_duration_ms("TW_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout waiting for the daemon to exit after shutdown
pub fn timeout_exit() -> Duration {
    parse_duration_ms("TW_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connect and exit waits
pub fn poll_interval() -> Duration {
    parse_duration_ms("TW_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running (no socket at {0})")]
    DaemonNotRunning(PathBuf),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("Daemon failed to start: {0}")]
    DaemonStartFailed(String),

    #[error("Timed out waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Configuration error: {0}")]
    Config(#[from] tw_daemon::LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon status summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub operations: usize,
    pub active: usize,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to a running daemon (no auto-start)
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning(socket_path.to_path_buf()));
        }
        Ok(Self {
            socket_path: socket_path.to_path_buf(),
        })
    }

    async fn open(&self, request: &Request) -> Result<(OwnedReadHalf, OwnedWriteHalf), ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (reader, mut writer) = stream.into_split();

        let data = protocol::encode(request)?;
        tokio::time::timeout(timeout_ipc(), protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok((reader, writer))
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let (mut reader, _writer) = self.open(&request).await?;
        let response_bytes = tokio::time::timeout(timeout_ipc(), protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(protocol::decode(&response_bytes)?)
    }

    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                operations,
                active,
            } => Ok(DaemonStatus {
                uptime_secs,
                operations,
                active,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_operation(&self, tool_call_id: &str) -> Result<Option<Operation>, ClientError> {
        match self
            .send(Request::GetOperation {
                tool_call_id: tool_call_id.to_string(),
            })
            .await?
        {
            Response::Operation { operation } => Ok(operation.map(|b| *b)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_operations(
        &self,
        chat_id: Option<String>,
        active_only: bool,
    ) -> Result<Vec<Operation>, ClientError> {
        match self
            .send(Request::ListOperations {
                chat_id,
                active_only,
            })
            .await?
        {
            Response::Operations { operations } => Ok(operations),
            other => Err(unexpected(other)),
        }
    }

    /// Returns whether the daemon performed the transition
    pub async fn stop(&self, tool_call_id: &str) -> Result<bool, ClientError> {
        match self
            .send(Request::StopTracking {
                tool_call_id: tool_call_id.to_string(),
            })
            .await?
        {
            Response::Stopped { transitioned } => Ok(transitioned),
            other => Err(unexpected(other)),
        }
    }

    pub async fn cancel(&self, tool_call_id: &str) -> Result<(), ClientError> {
        match self
            .send(Request::CancelOperation {
                tool_call_id: tool_call_id.to_string(),
            })
            .await?
        {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn remove(&self, tool_call_id: &str) -> Result<usize, ClientError> {
        match self
            .send(Request::RemoveOperation {
                tool_call_id: tool_call_id.to_string(),
            })
            .await?
        {
            Response::Removed { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    pub async fn cleanup(&self, retain: Duration) -> Result<usize, ClientError> {
        match self
            .send(Request::Cleanup {
                retain_secs: retain.as_secs(),
            })
            .await?
        {
            Response::Removed { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Open an update stream for a chat
    pub async fn subscribe(&self, chat_id: &str) -> Result<(SubscriptionId, Stream), ClientError> {
        let mut stream = self
            .stream(Request::Subscribe {
                chat_id: chat_id.to_string(),
            })
            .await?;
        match stream.next_response().await? {
            Some(Response::Subscribed { subscription_id }) => Ok((subscription_id, stream)),
            Some(other) => Err(unexpected(other)),
            None => Err(ProtocolError::ConnectionClosed.into()),
        }
    }

    /// Open the completion stream for a chat
    pub async fn watch_completions(&self, chat_id: &str) -> Result<Stream, ClientError> {
        let mut stream = self
            .stream(Request::WatchCompletions {
                chat_id: chat_id.to_string(),
            })
            .await?;
        match stream.next_response().await? {
            Some(Response::Watching) => Ok(stream),
            Some(other) => Err(unexpected(other)),
            None => Err(ProtocolError::ConnectionClosed.into()),
        }
    }

    async fn stream(&self, request: Request) -> Result<Stream, ClientError> {
        let (reader, writer) = self.open(&request).await?;
        Ok(Stream {
            reader,
            _writer: writer,
        })
    }
}

/// Frames pushed by the daemon on a streaming connection
pub struct Stream {
    reader: OwnedReadHalf,
    // Dropping the write half tells the daemon we left
    _writer: OwnedWriteHalf,
}

impl Stream {
    /// Next frame; `None` once the daemon closes the stream
    async fn next_response(&mut self) -> Result<Option<Response>, ClientError> {
        match protocol::read_message(&mut self.reader).await {
            Ok(bytes) => Ok(Some(protocol::decode(&bytes)?)),
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn next_update(&mut self) -> Result<Option<OperationUpdate>, ClientError> {
        match self.next_response().await? {
            Some(Response::Update { update }) => Ok(Some(*update)),
            Some(other) => Err(unexpected(other)),
            None => Ok(None),
        }
    }

    pub async fn next_completion(&mut self) -> Result<Option<CompletionEvent>, ClientError> {
        match self.next_response().await? {
            Some(Response::Completion { completion }) => Ok(Some(completion)),
            Some(other) => Err(unexpected(other)),
            None => Ok(None),
        }
    }
}

/// Start the daemon in the background and wait for its socket
pub fn daemon_start(config_path: Option<&Path>, config: &Config) -> Result<DaemonClient, ClientError> {
    if let Ok(client) = DaemonClient::connect(&config.socket_path) {
        return Ok(client);
    }

    let twd = find_twd_binary();
    let mut command = Command::new(&twd);
    if let Some(path) = config_path {
        command.arg(path);
    }
    let mut child = command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", twd.display(), e)))?;

    let start = Instant::now();
    while start.elapsed() < timeout_connect() {
        // Early exit means startup failed
        if let Ok(Some(status)) = child.try_wait() {
            return Err(ClientError::DaemonStartFailed(
                read_startup_error(&config.log_path)
                    .unwrap_or_else(|| format!("exited with {}", status)),
            ));
        }
        match DaemonClient::connect(&config.socket_path) {
            Ok(client) => return Ok(client),
            Err(ClientError::DaemonNotRunning(_)) => std::thread::sleep(poll_interval()),
            Err(e) => return Err(e),
        }
    }

    match read_startup_error(&config.log_path) {
        Some(err) => Err(ClientError::DaemonStartFailed(err)),
        None => Err(ClientError::DaemonStartTimeout),
    }
}

/// Ask the daemon to shut down and wait for its socket to disappear
///
/// Returns false if the daemon wasn't running.
pub async fn daemon_stop(socket_path: &Path) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(socket_path) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning(_)) => return Ok(false),
        Err(e) => return Err(e),
    };

    client.shutdown().await?;

    let start = Instant::now();
    while start.elapsed() < timeout_exit() {
        if !socket_path.exists() {
            break;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    Ok(true)
}

/// Find the twd binary
fn find_twd_binary() -> PathBuf {
    // Explicit override (used by tests to pin the binary)
    if let Ok(path) = std::env::var("TW_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("twd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("twd")
}

/// Error lines logged since the last startup marker, if any
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;

    let errors: Vec<String> = content[start_pos..]
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .map(|line| {
            // "timestamp LEVEL target: message"
            line.split_once(": ")
                .map_or_else(|| line.to_string(), |(_, msg)| msg.to_string())
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use tw_adapters::ToolExecutor;
use tw_core::{Clock, IdGen};
use tw_engine::{TrackRequest, Tracker};

use crate::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

/// Everything a connection task needs; cheap to clone
pub struct ServerContext<E, C: Clock, I: IdGen> {
    pub tracker: Tracker<E, C, I>,
    /// Fires when the daemon shuts down
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

impl<E: Clone, C: Clock, I: IdGen> Clone for ServerContext<E, C, I> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        }
    }
}

impl<E, C, I> ServerContext<E, C, I>
where
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    pub fn new(tracker: Tracker<E, C, I>, shutdown: CancellationToken, start_time: Instant) -> Self {
        Self {
            tracker,
            shutdown,
            start_time,
        }
    }
}

/// Handle a single client connection
pub async fn handle_connection<S, E, C, I>(
    ctx: ServerContext<E, C, I>,
    stream: S,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    match request {
        Request::Subscribe { chat_id } => stream_updates(&ctx, &chat_id, reader, writer).await,
        Request::WatchCompletions { chat_id } => {
            stream_completions(&ctx, &chat_id, reader, writer).await
        }
        request => {
            let response = handle_request(&ctx, request).await;
            debug!("Sending response: {:?}", response);
            protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
            Ok(())
        }
    }
}

/// Handle a single request and return a response
async fn handle_request<E, C, I>(ctx: &ServerContext<E, C, I>, request: Request) -> Response
where
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    let tracker = &ctx.tracker;
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let operations = tracker.list_operations();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                operations: operations.len(),
                active: operations.iter().filter(|op| !op.is_terminal()).count(),
            }
        }

        Request::StartTracking {
            tool_call_id,
            chat_id,
            tool_name,
            scenario,
            tool_result,
            behavior,
        } => {
            let request = TrackRequest {
                tool_call_id,
                chat_id,
                tool_name,
                scenario,
                tool_result,
                behavior: behavior.map(Arc::new),
            };
            match tracker.start_tracking(&ctx.shutdown, request) {
                Ok(operation) => Response::Operation {
                    operation: Some(Box::new(operation)),
                },
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::StopTracking { tool_call_id } => Response::Stopped {
            transitioned: tracker.stop_tracking(&tool_call_id),
        },

        Request::CancelOperation { tool_call_id } => {
            match tracker.cancel_operation(&ctx.shutdown, &tool_call_id).await {
                Ok(()) => Response::Ok,
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::GetOperation { tool_call_id } => Response::Operation {
            operation: tracker.get_operation(&tool_call_id).map(Box::new),
        },

        Request::ListOperations {
            chat_id,
            active_only,
        } => {
            let operations = match chat_id {
                Some(chat_id) => tracker.operations_for_chat(&chat_id),
                None => tracker.list_operations(),
            };
            Response::Operations {
                operations: operations
                    .into_iter()
                    .filter(|op| !active_only || !op.is_terminal())
                    .collect(),
            }
        }

        Request::Cleanup { retain_secs } => Response::Removed {
            count: tracker.cleanup_stale_operations(Duration::from_secs(retain_secs)),
        },

        Request::RemoveOperation { tool_call_id } => Response::Removed {
            count: usize::from(tracker.remove_operation(&tool_call_id).is_some()),
        },

        Request::Shutdown => {
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }

        Request::Subscribe { .. } | Request::WatchCompletions { .. } => {
            Response::error("streaming request must open its own connection")
        }
    }
}

/// Resolves once the client closes its side of the connection
async fn client_gone<R: AsyncRead + Unpin>(reader: &mut ReadHalf<R>) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

async fn stream_updates<S, E, C, I>(
    ctx: &ServerContext<E, C, I>,
    chat_id: &str,
    mut reader: ReadHalf<S>,
    mut writer: WriteHalf<S>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    let mut subscription = ctx.tracker.subscribe(chat_id);
    let id = subscription.id.clone();
    let result = async {
        protocol::write_response(
            &mut writer,
            &Response::Subscribed {
                subscription_id: id.clone(),
            },
            DEFAULT_TIMEOUT,
        )
        .await?;

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => break,
                _ = client_gone(&mut reader) => break,
                update = subscription.recv() => {
                    let Some(update) = update else { break };
                    let frame = Response::Update { update: Box::new(update) };
                    protocol::write_response(&mut writer, &frame, DEFAULT_TIMEOUT).await?;
                }
            }
        }
        Ok::<(), ServerError>(())
    }
    .await;

    ctx.tracker.unsubscribe(&id);
    debug!(subscription_id = %id, chat_id, "update stream closed");
    result
}

async fn stream_completions<S, E, C, I>(
    ctx: &ServerContext<E, C, I>,
    chat_id: &str,
    mut reader: ReadHalf<S>,
    mut writer: WriteHalf<S>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: ToolExecutor,
    C: Clock,
    I: IdGen,
{
    if ctx.tracker.has_completion_callback(chat_id) {
        warn!(chat_id, "replacing existing completion watcher");
    }
    let mut completions = ctx.tracker.register_completion_callback(chat_id);
    let result = async {
        protocol::write_response(&mut writer, &Response::Watching, DEFAULT_TIMEOUT).await?;

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => break,
                _ = client_gone(&mut reader) => break,
                completion = completions.recv() => {
                    let Some(completion) = completion else { break };
                    let frame = Response::Completion { completion };
                    protocol::write_response(&mut writer, &frame, DEFAULT_TIMEOUT).await?;
                }
            }
        }
        Ok::<(), ServerError>(())
    }
    .await;

    // A replaced queue is already closed and the chat belongs to its successor,
    // even when the client left before the close was observed
    if !completions.is_closed() {
        ctx.tracker.unregister_completion_callback(chat_id);
    }
    debug!(chat_id, "completion stream closed");
    result
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

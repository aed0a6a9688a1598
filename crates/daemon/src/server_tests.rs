// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tw_adapters::FakeToolExecutor;
use tw_core::{
    AsyncBehavior, CompletionConditions, FakeClock, SequentialIdGen, StatusPolling,
};
use tw_engine::TrackerConfig;

type TestContext = ServerContext<FakeToolExecutor, FakeClock, SequentialIdGen>;

fn context() -> TestContext {
    let tracker = Tracker::new(
        FakeToolExecutor::new(),
        FakeClock::new(),
        SequentialIdGen::new("sub"),
        TrackerConfig::default(),
    );
    ServerContext::new(tracker, CancellationToken::new(), Instant::now())
}

fn behavior() -> AsyncBehavior {
    AsyncBehavior {
        status_polling: Some(StatusPolling {
            status_tool: "job_status".to_string(),
            status_tool_id_param: "job_id".to_string(),
            operation_id_field: "run_id".to_string(),
            poll_interval_seconds: 1,
            max_poll_duration_seconds: 600,
        }),
        completion_conditions: Some(CompletionConditions {
            status_field: "state".to_string(),
            success_values: vec!["completed".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn start_request(id: &str) -> Request {
    Request::StartTracking {
        tool_call_id: id.to_string(),
        chat_id: "chat-1".to_string(),
        tool_name: "train_model".to_string(),
        scenario: String::new(),
        tool_result: json!({ "run_id": format!("run-{id}") }),
        behavior: Some(behavior()),
    }
}

struct Client {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl Client {
    async fn open(ctx: &TestContext, request: Request) -> Self {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(ctx.clone(), server));
        let (reader, mut writer) = tokio::io::split(client);
        let data = protocol::encode(&request).unwrap();
        protocol::write_message(&mut writer, &data).await.unwrap();
        Self {
            reader,
            writer,
            task,
        }
    }

    async fn next(&mut self) -> Response {
        let bytes = protocol::read_message(&mut self.reader).await.unwrap();
        protocol::decode(&bytes).unwrap()
    }
}

async fn send(ctx: &TestContext, request: Request) -> Response {
    let mut client = Client::open(ctx, request).await;
    let response = client.next().await;
    client.task.await.unwrap().unwrap();
    response
}

#[tokio::test]
async fn ping_and_hello() {
    let ctx = context();

    assert_eq!(send(&ctx, Request::Ping).await, Response::Pong);
    assert_eq!(
        send(
            &ctx,
            Request::Hello {
                version: "0.0.0".to_string()
            }
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn start_get_and_stop_operation() {
    let ctx = context();

    let Response::Operation {
        operation: Some(started),
    } = send(&ctx, start_request("call-1")).await
    else {
        panic!("expected operation");
    };
    assert_eq!(started.external_run_id, "run-call-1");
    assert_eq!(started.status, "pending");

    let status = send(&ctx, Request::Status).await;
    assert!(matches!(
        status,
        Response::Status {
            operations: 1,
            active: 1,
            ..
        }
    ));

    let stopped = send(
        &ctx,
        Request::StopTracking {
            tool_call_id: "call-1".to_string(),
        },
    )
    .await;
    assert_eq!(stopped, Response::Stopped { transitioned: true });

    let Response::Operation {
        operation: Some(op),
    } = send(
        &ctx,
        Request::GetOperation {
            tool_call_id: "call-1".to_string(),
        },
    )
    .await
    else {
        panic!("expected operation");
    };
    assert_eq!(op.status, "cancelled");
}

#[tokio::test]
async fn tracker_errors_become_error_responses() {
    let ctx = context();
    send(&ctx, start_request("call-1")).await;

    let duplicate = send(&ctx, start_request("call-1")).await;
    assert!(matches!(duplicate, Response::Error { message } if message.contains("already tracked")));

    let missing = send(
        &ctx,
        Request::CancelOperation {
            tool_call_id: "never".to_string(),
        },
    )
    .await;
    assert!(matches!(missing, Response::Error { message } if message.contains("not found")));

    let unknown = send(
        &ctx,
        Request::GetOperation {
            tool_call_id: "never".to_string(),
        },
    )
    .await;
    assert_eq!(unknown, Response::Operation { operation: None });
    ctx.tracker.shutdown();
}

#[tokio::test]
async fn list_filters_by_chat_and_activity() {
    let ctx = context();
    send(&ctx, start_request("a")).await;
    send(&ctx, start_request("b")).await;
    ctx.tracker.stop_tracking("a");

    let Response::Operations { operations } = send(
        &ctx,
        Request::ListOperations {
            chat_id: Some("chat-1".to_string()),
            active_only: true,
        },
    )
    .await
    else {
        panic!("expected operations");
    };
    let ids: Vec<_> = operations.iter().map(|op| op.tool_call_id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);

    let Response::Operations { operations } = send(
        &ctx,
        Request::ListOperations {
            chat_id: None,
            active_only: false,
        },
    )
    .await
    else {
        panic!("expected operations");
    };
    assert_eq!(operations.len(), 2);
    ctx.tracker.shutdown();
}

#[tokio::test]
async fn remove_and_cleanup_report_counts() {
    let ctx = context();
    send(&ctx, start_request("a")).await;
    send(&ctx, start_request("b")).await;
    ctx.tracker.stop_tracking("a");

    let removed = send(&ctx, Request::Cleanup { retain_secs: 0 }).await;
    assert_eq!(removed, Response::Removed { count: 0 });

    let removed = send(
        &ctx,
        Request::RemoveOperation {
            tool_call_id: "b".to_string(),
        },
    )
    .await;
    assert_eq!(removed, Response::Removed { count: 1 });
    assert_eq!(ctx.tracker.operation_count(), 1);
}

#[tokio::test]
async fn subscribe_streams_updates_until_client_leaves() {
    let ctx = context();
    let mut client = Client::open(
        &ctx,
        Request::Subscribe {
            chat_id: "chat-1".to_string(),
        },
    )
    .await;

    let Response::Subscribed { subscription_id } = client.next().await else {
        panic!("expected subscribed");
    };
    assert_eq!(ctx.tracker.subscriber_count("chat-1"), 1);

    send(&ctx, start_request("call-1")).await;
    let Response::Update { update } = client.next().await else {
        panic!("expected update");
    };
    assert_eq!(update.tool_call_id, "call-1");
    assert_eq!(update.status, "pending");

    ctx.tracker.stop_tracking("call-1");
    let Response::Update { update } = client.next().await else {
        panic!("expected update");
    };
    assert!(update.is_terminal);

    drop(client.writer);
    drop(client.reader);
    client.task.await.unwrap().unwrap();
    assert_eq!(ctx.tracker.subscriber_count("chat-1"), 0);
    assert!(!ctx.tracker.unsubscribe(&subscription_id));
}

#[tokio::test]
async fn watch_completions_streams_terminal_events() {
    let ctx = context();
    let mut client = Client::open(
        &ctx,
        Request::WatchCompletions {
            chat_id: "chat-1".to_string(),
        },
    )
    .await;
    assert_eq!(client.next().await, Response::Watching);
    assert!(ctx.tracker.has_completion_callback("chat-1"));

    send(&ctx, start_request("call-1")).await;
    ctx.tracker.stop_tracking("call-1");

    let Response::Completion { completion } = client.next().await else {
        panic!("expected completion");
    };
    assert_eq!(completion.tool_call_id, "call-1");
    assert_eq!(completion.status, "cancelled");

    ctx.shutdown.cancel();
    client.task.await.unwrap().unwrap();
    assert!(!ctx.tracker.has_completion_callback("chat-1"));
}

fn watch_request() -> Request {
    Request::WatchCompletions {
        chat_id: "chat-1".to_string(),
    }
}

#[tokio::test]
async fn replaced_watcher_leaving_keeps_successor_registered() {
    let ctx = context();
    let mut first = Client::open(&ctx, watch_request()).await;
    assert_eq!(first.next().await, Response::Watching);

    let mut second = Client::open(&ctx, watch_request()).await;
    assert_eq!(second.next().await, Response::Watching);

    // The first client disconnects after its queue was replaced
    drop(first.writer);
    drop(first.reader);
    first.task.await.unwrap().unwrap();
    assert!(ctx.tracker.has_completion_callback("chat-1"));

    send(&ctx, start_request("call-1")).await;
    ctx.tracker.stop_tracking("call-1");
    let Response::Completion { completion } = second.next().await else {
        panic!("expected completion");
    };
    assert_eq!(completion.tool_call_id, "call-1");

    drop(second.writer);
    drop(second.reader);
    second.task.await.unwrap().unwrap();
    assert!(!ctx.tracker.has_completion_callback("chat-1"));
}

#[tokio::test]
async fn shutdown_request_fires_token() {
    let ctx = context();

    assert_eq!(send(&ctx, Request::Shutdown).await, Response::ShuttingDown);
    assert!(ctx.shutdown.is_cancelled());
}

#[tokio::test]
async fn closed_connection_before_request_is_fine() {
    let ctx = context();
    let (client, server) = tokio::io::duplex(64);
    drop(client);

    handle_connection(ctx, server).await.unwrap();
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tw_engine::TrackerConfig;

fn config_in(dir: &Path) -> Config {
    Config {
        socket_path: dir.join("run/twd.sock"),
        lock_path: dir.join("state/twd.pid"),
        log_path: dir.join("state/twd.log"),
        tracker: TrackerConfig {
            retention: Some(Duration::from_secs(3600)),
            ..TrackerConfig::default()
        },
        tools: HashMap::new(),
    }
}

#[tokio::test]
async fn startup_binds_socket_and_writes_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let mut daemon = startup(&config).await.unwrap();

    assert!(config.socket_path.exists());
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    daemon.shutdown().await.unwrap();
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(daemon.shutdown.is_cancelled());
}

#[tokio::test]
async fn second_instance_fails_without_touching_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut first = startup(&config).await.unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());
    first.shutdown().await.unwrap();
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(config.socket_path.parent().unwrap()).unwrap();
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let mut daemon = startup(&config).await.unwrap();

    assert!(tokio::net::UnixStream::connect(&config.socket_path)
        .await
        .is_ok());
    daemon.shutdown().await.unwrap();
}

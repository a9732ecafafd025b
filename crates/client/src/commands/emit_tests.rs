// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use tempfile::TempDir;
use vzsync_core::RetryConfig;

/// Nothing listens on the discard port.
const UNREACHABLE: &str = "ws://127.0.0.1:9";

fn offline_config(temp: &TempDir) -> Config {
    Config {
        queue_path: Some(temp.path().join("queue.jsonl")),
        retry: RetryConfig { max_attempts: 1, ..RetryConfig::default() },
        ..Config::default()
    }
}

#[tokio::test]
async fn unreachable_server_queues_and_persists() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);
    let (queue, path) = crate::commands::load_queue(&config).unwrap();

    let outcome = emit(
        &config,
        UNREACHABLE,
        "device:update",
        json!({ "deviceId": "d1" }),
        EmitOptions::default(),
        queue,
        &path,
    )
    .await
    .unwrap();

    assert!(outcome.queued);
    assert_eq!(outcome.replayed, 0);
    let persisted = OfflineQueue::load(&path, 50).unwrap();
    let item = persisted.get(&outcome.id).unwrap();
    assert_eq!(item.event, "device:update");
    assert_eq!(item.data, json!({ "deviceId": "d1" }));
}

#[tokio::test]
async fn queued_events_accumulate_across_runs() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);

    for n in 0..2 {
        let (queue, path) = crate::commands::load_queue(&config).unwrap();
        emit(&config, UNREACHABLE, "x", json!({ "n": n }), EmitOptions::default(), queue, &path)
            .await
            .unwrap();
    }

    let persisted = OfflineQueue::load(&config.queue_path().unwrap(), 50).unwrap();
    let payloads: Vec<_> = persisted.iter().map(|item| item.data.clone()).collect();
    assert_eq!(payloads, vec![json!({ "n": 0 }), json!({ "n": 1 })]);
}

#[test]
fn invalid_payload_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);

    let result = run(&config, "x", "{not json", false, Some(UNREACHABLE));

    assert!(matches!(result, Err(Error::InvalidPayload(_))));
}

#[test]
fn missing_url_is_rejected() {
    let temp = TempDir::new().unwrap();
    let result = run(&offline_config(&temp), "x", "{}", false, None);
    assert!(matches!(result, Err(Error::MissingUrl)));
}

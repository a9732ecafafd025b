// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end behavior through the public API.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use vzsync::sync::{Coordinator, EmitOptions, Frame, Inbound, Socket, SyncConfig, TransportFuture};
use vzsync_core::{
    apply_with_retry, CircuitBreakerConfig, OptimisticStore, RecoveryController, RetryConfig,
};

/// Socket that records every emit.
#[derive(Clone, Default)]
struct RecordingSocket {
    emitted: Arc<Mutex<Vec<Frame>>>,
}

impl Socket for RecordingSocket {
    fn emit(&mut self, event: &str, payload: Value) -> TransportFuture<'_, ()> {
        self.emitted.lock().unwrap().push(Frame::new(event, payload));
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&mut self, _events: &[&str]) {}

    fn unsubscribe(&mut self, _events: &[&str]) {}

    fn is_connected(&self) -> bool {
        false
    }
}

fn controller(max_attempts: u32) -> RecoveryController {
    RecoveryController::new(
        RetryConfig { max_attempts, jitter: false, ..RetryConfig::default() },
        CircuitBreakerConfig::default(),
    )
}

#[tokio::test]
async fn offline_emit_is_replayed_once_on_connect() {
    let socket = RecordingSocket::default();
    let mut coordinator = Coordinator::new(SyncConfig::default(), socket.clone());
    coordinator.init();

    let payload = json!({ "deviceId": "d1", "status": "offline" });
    let id = coordinator.emit_event("device:update", payload, EmitOptions::default()).await;
    assert_eq!(coordinator.offline_queue_len(), 1);

    coordinator.handle_inbound(Inbound::Connect).await;

    assert_eq!(coordinator.offline_queue_len(), 0);
    let emitted = socket.emitted.lock().unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].event, "device:update");
    assert_eq!(emitted[0].data, json!({ "deviceId": "d1", "status": "offline", "eventId": id }));
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_two_failures() {
    let recovery = controller(3);
    let calls = AtomicU32::new(0);
    let successes = AtomicU32::new(0);
    let failures = AtomicU32::new(0);

    let result = recovery
        .retry_with(
            "x",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 2 {
                        Err(format!("attempt {n} failed"))
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| {
                successes.fetch_add(1, Ordering::SeqCst);
            },
            |_| {
                failures.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_rejects_sixth_call_without_invoking() {
    let recovery = controller(1);
    let calls = AtomicU32::new(0);
    let op = || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>("unavailable") }
    };

    for _ in 0..5 {
        recovery.retry("x", op).await.unwrap_err();
    }
    assert!(recovery.is_circuit_breaker_open());

    let error = recovery.retry("x", op).await.unwrap_err();

    assert!(error.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn failed_mutation_rolls_back_store() {
    let store = Mutex::new(OptimisticStore::new(json!({ "name": "Lobby" })));
    let recovery = controller(2);

    let result = apply_with_retry(
        &store,
        &recovery,
        "rename",
        |_: &Value| json!({ "name": "Entrance" }),
        || async { Err::<(), _>("503") },
    )
    .await;

    assert!(result.is_err());
    let store = store.lock().unwrap();
    assert_eq!(*store.state(), json!({ "name": "Lobby" }));
    assert!(!store.has_pending_updates());
}

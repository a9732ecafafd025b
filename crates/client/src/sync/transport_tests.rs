// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport module.

#![allow(clippy::unwrap_used)]

use super::test_helpers::MockSocket;
use super::transport::{classify, Frame, Incoming, Socket, Transport, TransportError, WebSocketTransport};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use yare::parameterized;

#[test]
fn frame_wire_format() {
    let frame = Frame::new("device:update", json!({ "deviceId": "d1" }));
    let text = serde_json::to_string(&frame).unwrap();
    assert_eq!(text, r#"{"event":"device:update","data":{"deviceId":"d1"}}"#);

    let parsed: Frame = serde_json::from_str(r#"{"event":"sync:ack"}"#).unwrap();
    assert_eq!(parsed, Frame::new("sync:ack", serde_json::Value::Null));
}

#[test]
fn text_message_becomes_frame() {
    let message = Message::Text(r#"{"event":"health:alert","data":{"deviceId":"d1"}}"#.into());
    assert_eq!(classify(message), Incoming::Frame(Frame::new("health:alert", json!({ "deviceId": "d1" }))));
}

#[parameterized(
    malformed = { Message::Text("not json".into()), Incoming::Skip },
    missing_event = { Message::Text(r#"{"data":1}"#.into()), Incoming::Skip },
    binary = { Message::Binary(vec![1u8, 2, 3].into()), Incoming::Skip },
    ping = { Message::Ping(Default::default()), Incoming::Skip },
    close = { Message::Close(None), Incoming::Closed },
)]
fn non_event_messages(message: Message, expected: Incoming) {
    assert_eq!(classify(message), expected);
}

#[test]
fn websocket_subscriptions() {
    let mut transport = WebSocketTransport::new();
    transport.subscribe(&["a", "b"]);
    assert!(transport.is_subscribed("a"));

    transport.unsubscribe(&["a"]);
    assert!(!transport.is_subscribed("a"));
    assert!(transport.is_subscribed("b"));
}

#[tokio::test]
async fn websocket_emit_requires_connection() {
    let mut transport = WebSocketTransport::new();
    assert!(!transport.is_connected());
    assert!(matches!(transport.emit("x", json!({})).await, Err(TransportError::NotConnected)));
    assert!(matches!(transport.recv().await, Err(TransportError::NotConnected)));
    transport.disconnect().await.unwrap();
}

#[tokio::test]
async fn websocket_connect_refused() {
    let mut transport = WebSocketTransport::new();
    // Port 9 (discard) is closed on test machines.
    let result = transport.connect("ws://127.0.0.1:9").await;
    assert!(matches!(result, Err(TransportError::Connect { ref url, .. }) if url == "ws://127.0.0.1:9"));
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn mock_socket_records_and_replays() {
    let mut socket = MockSocket::new();
    let handle = socket.clone();

    socket.connect("ws://localhost:1234").await.unwrap();
    assert!(handle.is_connected());

    socket.emit("device:update", json!({ "deviceId": "d1" })).await.unwrap();
    assert_eq!(handle.outgoing(), vec![Frame::new("device:update", json!({ "deviceId": "d1" }))]);

    handle.queue_incoming("health:alert", json!({ "deviceId": "d1" }));
    let frame = socket.recv().await.unwrap().unwrap();
    assert_eq!(frame.event, "health:alert");

    assert!(socket.recv().await.unwrap().is_none());
    assert!(!handle.is_connected());
}

#[tokio::test]
async fn mock_socket_failures_are_counted() {
    let mut socket = MockSocket::connected();
    socket.fail_next_emits(1);

    assert!(socket.emit("a", json!({})).await.is_err());
    assert!(socket.emit("a", json!({})).await.is_ok());
    assert_eq!(socket.outgoing().len(), 1);
}

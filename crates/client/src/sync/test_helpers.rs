// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::queue::OfflineQueueItem;
use super::transport::{Frame, Socket, Transport, TransportError, TransportFuture};

/// Create a queue item with the given id.
pub fn queue_item(id: &str) -> OfflineQueueItem {
    OfflineQueueItem {
        id: id.to_string(),
        event: "device:update".to_string(),
        data: json!({ "n": id }),
        timestamp: 1_000,
        retry_count: 0,
    }
}

/// Mock socket and transport for testing without real sockets.
///
/// Clones share state, so a test can keep a handle after moving one into
/// a coordinator.
#[derive(Clone, Default)]
pub struct MockSocket {
    connected: Arc<AtomicBool>,
    /// Frames returned by recv(), in order.
    incoming: Arc<Mutex<VecDeque<Frame>>>,
    /// Frames passed to emit().
    outgoing: Arc<Mutex<Vec<Frame>>>,
    subscriptions: Arc<Mutex<HashSet<String>>>,
    /// Number of upcoming emits that fail.
    failing_emits: Arc<AtomicU32>,
    /// Number of upcoming connects that fail.
    failing_connects: Arc<AtomicU32>,
    connect_attempts: Arc<AtomicU32>,
}

impl MockSocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let socket = Self::new();
        socket.set_connected(true);
        socket
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn queue_incoming(&self, event: &str, data: Value) {
        self.incoming.lock().unwrap().push_back(Frame::new(event, data));
    }

    pub fn outgoing(&self) -> Vec<Frame> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> HashSet<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn fail_next_emits(&self, count: u32) {
        self.failing_emits.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.failing_connects.store(count, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

impl Socket for MockSocket {
    fn emit(&mut self, event: &str, payload: Value) -> TransportFuture<'_, ()> {
        let frame = Frame::new(event, payload);
        Box::pin(async move {
            if Self::take_failure(&self.failing_emits) {
                return Err(TransportError::Send { event: frame.event, message: "mock failure".into() });
            }
            self.outgoing.lock().unwrap().push(frame);
            Ok(())
        })
    }

    fn subscribe(&mut self, events: &[&str]) {
        self.subscriptions.lock().unwrap().extend(events.iter().map(|e| e.to_string()));
    }

    fn unsubscribe(&mut self, events: &[&str]) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        for event in events {
            subscriptions.remove(*event);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Transport for MockSocket {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            self.connect_attempts.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.failing_connects) {
                return Err(TransportError::Connect { url, message: "mock failure".into() });
            }
            self.set_connected(true);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.set_connected(false);
            Ok(())
        })
    }

    /// Pops the next queued frame; an empty queue reads as a closed connection.
    fn recv(&mut self) -> TransportFuture<'_, Option<Frame>> {
        Box::pin(async move {
            let frame = self.incoming.lock().unwrap().pop_front();
            if frame.is_none() {
                self.set_connected(false);
            }
            Ok(frame)
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket abstraction for the realtime event channel.
//!
//! [`Socket`] is what the coordinator consumes: named events out, a
//! subscription set in. [`Transport`] adds connection management and
//! receiving for the runner. Both are object-safe so tests can swap in
//! mocks.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Error type for socket and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// No live connection.
    #[error("socket is not connected")]
    NotConnected,

    #[error("failed to send '{event}': {message}")]
    Send { event: String, message: String },

    #[error("failed to receive: {0}")]
    Receive(String),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by socket and transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// One named event on the wire: `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Frame { event: event.into(), data }
    }

    fn to_message(&self) -> TransportResult<Message> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}

/// What a received WebSocket message means for the event stream.
#[derive(Debug, PartialEq)]
pub(super) enum Incoming {
    Frame(Frame),
    /// Control traffic, binary data or malformed text.
    Skip,
    Closed,
}

pub(super) fn classify(message: Message) -> Incoming {
    match message {
        Message::Text(text) => match serde_json::from_str::<Frame>(text.as_str()) {
            Ok(frame) => Incoming::Frame(frame),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                Incoming::Skip
            }
        },
        Message::Close(_) => Incoming::Closed,
        _ => Incoming::Skip,
    }
}

/// Bidirectional named-event channel.
pub trait Socket: Send + Sync {
    /// Sends `payload` under `event`.
    fn emit(&mut self, event: &str, payload: Value) -> TransportFuture<'_, ()>;

    /// Starts delivering the named events.
    fn subscribe(&mut self, events: &[&str]);

    /// Stops delivering the named events.
    fn unsubscribe(&mut self, events: &[&str]);

    fn is_connected(&self) -> bool;
}

/// A [`Socket`] that can also connect and receive.
pub trait Transport: Socket {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Closes the connection. Harmless when not connected.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Waits for the next frame of a subscribed event.
    ///
    /// `Ok(None)` means the server closed the connection.
    fn recv(&mut self) -> TransportFuture<'_, Option<Frame>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Transport`] over a tokio-tungstenite WebSocket with JSON text frames.
///
/// Frames for events nobody subscribed to are dropped on receipt. Any send
/// or receive error drops the connection.
#[derive(Default)]
pub struct WebSocketTransport {
    ws: Option<WsStream>,
    subscriptions: HashSet<String>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, event: &str) -> bool {
        self.subscriptions.contains(event)
    }
}

impl Socket for WebSocketTransport {
    fn emit(&mut self, event: &str, payload: Value) -> TransportFuture<'_, ()> {
        let frame = Frame::new(event, payload);
        Box::pin(async move {
            let message = frame.to_message()?;
            let ws = self.ws.as_mut().ok_or(TransportError::NotConnected)?;
            // `send` flushes.
            if let Err(e) = ws.send(message).await {
                self.ws = None;
                return Err(TransportError::Send { event: frame.event, message: e.to_string() });
            }
            Ok(())
        })
    }

    fn subscribe(&mut self, events: &[&str]) {
        self.subscriptions.extend(events.iter().map(|e| e.to_string()));
    }

    fn unsubscribe(&mut self, events: &[&str]) {
        self.subscriptions.retain(|s| !events.contains(&s.as_str()));
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    self.ws = Some(ws);
                    Ok(())
                }
                Err(e) => Err(TransportError::Connect { url, message: e.to_string() }),
            }
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                if let Err(e) = ws.close(None).await {
                    tracing::debug!(error = %e, "close handshake failed");
                }
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<Frame>> {
        Box::pin(async move {
            loop {
                let ws = self.ws.as_mut().ok_or(TransportError::NotConnected)?;
                let message = match ws.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::Receive(e.to_string()));
                    }
                    None => Message::Close(None),
                };

                match classify(message) {
                    Incoming::Frame(frame) if self.subscriptions.contains(&frame.event) => {
                        return Ok(Some(frame));
                    }
                    Incoming::Frame(frame) => {
                        tracing::trace!(event = %frame.event, "dropping unsubscribed frame");
                    }
                    Incoming::Skip => {}
                    Incoming::Closed => {
                        self.ws = None;
                        return Ok(None);
                    }
                }
            }
        })
    }
}

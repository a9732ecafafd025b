// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime sync over a named-event socket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Coordinator │────►│   Socket    │────►│  Realtime   │
//! │             │◄────│ (Transport) │◄────│   Server    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   ▲
//!        ▼                   │
//! ┌─────────────┐     ┌─────────────┐
//! │   Queue     │     │   Runner    │  (connect, backoff, pump frames)
//! │ (offline)   │     └─────────────┘
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - Bounded offline queue, drained FIFO on reconnect
//! - Optimistic emissions confirmed by server pushes, optionally applied to
//!   an `OptimisticStore` that is committed or rolled back with them
//! - Remote-wins conflict merge for colliding playlist edits
//! - Queue items over their retry budget parked for manual resolution
//! - Optional acknowledged delivery via `sync:ack`
//! - Injectable socket trait for testing

mod coordinator;
mod queue;
pub mod runner;
mod transport;

pub use coordinator::{
    Coordinator, Delivery, DrainReport, EmitOptions, Inbound, PendingChange, SharedStore, SyncConfig,
    SyncError, SyncEvent, SyncResult, SyncState, DEFAULT_OFFLINE_QUEUE_SIZE, DEFAULT_RETRY_ATTEMPTS,
};
pub use queue::{OfflineQueue, OfflineQueueItem, QueueError, QueueResult};
pub use runner::{ConnectOutcome, ReconnectConfig};
pub use transport::{
    Frame, Socket, Transport, TransportError, TransportFuture, TransportResult, WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;




#[cfg(test)]
mod transport_tests;

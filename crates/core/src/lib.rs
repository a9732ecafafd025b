// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! vzsync-core: client-side state synchronization primitives
//!
//! This crate provides the optimistic state store, the error recovery
//! controller (retries with backoff plus a circuit breaker), conflict
//! merging and the socket event payloads used by the vzsync client.

pub mod clock;
pub mod error;
pub mod listeners;
pub mod merge;
pub mod mutation;
pub mod optimistic;
pub mod protocol;
pub mod recovery;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use listeners::{ListenerId, Listeners};
pub use merge::resolve_conflict;
pub use mutation::apply_with_retry;
pub use optimistic::{BatchUpdate, OptimisticStore, OptimisticUpdate, StoreEvent};
pub use recovery::{
    Backoff, CircuitBreakerConfig, CircuitBreakerState, CircuitState, ErrorInfo, RecoveryController,
    RecoveryEvent, RetryConfig, Severity,
};

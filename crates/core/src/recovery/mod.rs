// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error recovery for operations against an unreliable backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌─────────────┐
//! │ RecoveryController   │────►│  operation  │ (caller-supplied future)
//! │  retry / record_error│     └─────────────┘
//! └──────────────────────┘
//!        │          │
//!        ▼          ▼
//! ┌────────────┐ ┌────────────────┐
//! │  Backoff   │ │ CircuitBreaker │
//! │ (delays)   │ │ (fail fast)    │
//! └────────────┘ └────────────────┘
//! ```
//!
//! # Features
//!
//! - Bounded retries with exponential backoff and jitter
//! - Circuit breaker that opens after repeated failures and self-probes
//!   after a cooldown
//! - Per-operation error bookkeeping with severities
//! - Cancellable retry waits

mod backoff;
mod breaker;
mod config;
mod controller;

pub use backoff::Backoff;
pub use breaker::{CircuitBreaker, CircuitBreakerState, CircuitState, Transition};
pub use config::{CircuitBreakerConfig, RetryConfig};
pub use controller::{ErrorInfo, RecoveryController, RecoveryEvent, Severity};

#[cfg(test)]
mod backoff_tests;

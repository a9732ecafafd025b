// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry and circuit breaker settings.
//!
//! Both structs deserialize from partial tables; omitted fields take their
//! defaults.

use serde::{Deserialize, Serialize};

/// Retry policy for [`RecoveryController::retry`](super::RecoveryController::retry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of times the operation is invoked per retry chain.
    pub max_attempts: u32,
    /// Delay after the first failed attempt (milliseconds).
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay before jitter (milliseconds).
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.5)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (since the last success) that open the breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the breaker.
    pub success_threshold: u32,
    /// Time an open breaker waits before probing again (milliseconds).
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig { failure_threshold: 5, success_threshold: 2, timeout_ms: 60_000 }
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker state machine.
//!
//! Transitions:
//! - `Closed` → `Open`: after `failure_threshold` failures since the last success
//! - `Open` → `HalfOpen`: first check after `timeout_ms` has elapsed
//! - `HalfOpen` → `Closed`: after `success_threshold` consecutive successes
//! - `HalfOpen` → `Open`: on any failure
//!
//! The breaker never reads the clock itself; callers pass `now_ms`.

use serde::{Deserialize, Serialize};

use super::config::CircuitBreakerConfig;

/// Breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failing fast, calls are rejected without running.
    Open,
    /// Probing whether the dependency recovered.
    HalfOpen,
}

/// A state change reported by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Snapshot of the breaker for display and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_time: Option<u64>,
    pub last_state_change_time: u64,
}

/// Counts failures and successes and decides whether calls may proceed.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitBreakerState,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, now_ms: u64) -> Self {
        CircuitBreaker {
            config,
            state: CircuitBreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                last_state_change_time: now_ms,
            },
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.state
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        self.state.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.state == CircuitState::Open
    }

    /// Moves an expired `Open` breaker to `HalfOpen`.
    ///
    /// Called lazily at the start of every guarded call; there is no
    /// background timer.
    pub fn poll(&mut self, now_ms: u64) -> Option<Transition> {
        if self.state.state != CircuitState::Open {
            return None;
        }
        let elapsed = now_ms.saturating_sub(self.state.last_state_change_time);
        if elapsed < self.config.timeout_ms {
            return None;
        }

        self.state.failure_count = 0;
        self.state.success_count = 0;
        Some(self.transition(CircuitState::HalfOpen, now_ms))
    }

    /// Records a successful call.
    pub fn record_success(&mut self, now_ms: u64) -> Option<Transition> {
        self.state.failure_count = 0;
        self.state.success_count = self.state.success_count.saturating_add(1);

        if self.state.state == CircuitState::HalfOpen
            && self.state.success_count >= self.config.success_threshold
        {
            self.state.success_count = 0;
            return Some(self.transition(CircuitState::Closed, now_ms));
        }
        None
    }

    /// Records a failed call.
    pub fn record_failure(&mut self, now_ms: u64) -> Option<Transition> {
        self.state.success_count = 0;
        self.state.failure_count = self.state.failure_count.saturating_add(1);
        self.state.last_failure_time = Some(now_ms);

        match self.state.state {
            CircuitState::Closed if self.state.failure_count >= self.config.failure_threshold => {
                Some(self.transition(CircuitState::Open, now_ms))
            }
            CircuitState::HalfOpen => Some(self.transition(CircuitState::Open, now_ms)),
            _ => None,
        }
    }

    /// Forces `Closed` with cleared counters.
    pub fn reset(&mut self, now_ms: u64) -> Transition {
        self.state.failure_count = 0;
        self.state.success_count = 0;
        self.state.last_failure_time = None;
        self.transition(CircuitState::Closed, now_ms)
    }

    fn transition(&mut self, to: CircuitState, now_ms: u64) -> Transition {
        let from = self.state.state;
        self.state.state = to;
        self.state.last_state_change_time = now_ms;
        Transition { from, to }
    }
}

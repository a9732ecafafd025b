// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry controller with circuit breaking.
//!
//! Wraps caller-supplied async operations. A single failed attempt is
//! absorbed and reported as a [`RecoveryEvent::Retry`]; only exhausted
//! chains and breaker rejections surface as [`RecoveryEvent::Error`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::backoff::Backoff;
use super::breaker::{CircuitBreaker, CircuitBreakerState, CircuitState, Transition};
use super::config::{CircuitBreakerConfig, RetryConfig};
use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};
use crate::listeners::{ListenerId, Listeners};

/// How loudly a failure should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Bookkeeping for a failing operation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub id: String,
    /// Display form of the last error.
    pub error: String,
    pub severity: Severity,
    /// When the entry was created (ms).
    pub timestamp: u64,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_time: Option<u64>,
}

/// Notifications emitted by [`RecoveryController`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryEvent {
    /// An error that should be shown to the user.
    Error(ErrorInfo),
    /// An attempt failed and another one is scheduled.
    Retry(ErrorInfo),
    /// The breaker opened (`true`) or closed (`false`).
    CircuitChanged { open: bool },
}

struct Inner {
    errors: BTreeMap<String, ErrorInfo>,
    breaker: CircuitBreaker,
    /// Cancellation handles for retry chains currently waiting or running,
    /// tagged with their chain number. Chains may share an id.
    retries: HashMap<String, Vec<(u64, CancellationToken)>>,
    next_chain: u64,
}

impl Inner {
    fn start_chain(&mut self, id: &str) -> (u64, CancellationToken) {
        let chain = self.next_chain;
        self.next_chain += 1;
        let token = CancellationToken::new();
        self.retries.entry(id.to_string()).or_default().push((chain, token.clone()));
        (chain, token)
    }

    /// Forgets one chain's handle, leaving other chains on the same id alone.
    fn finish_chain(&mut self, id: &str, chain: u64) {
        if let Some(chains) = self.retries.get_mut(id) {
            chains.retain(|(n, _)| *n != chain);
            if chains.is_empty() {
                self.retries.remove(id);
            }
        }
    }
}

/// Executes operations with bounded retries and a shared circuit breaker.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct RecoveryController<C: ClockSource = SystemClock> {
    retry_config: RetryConfig,
    backoff: Backoff,
    clock: C,
    inner: Mutex<Inner>,
    listeners: Listeners<RecoveryEvent>,
}

impl RecoveryController<SystemClock> {
    pub fn new(retry_config: RetryConfig, breaker_config: CircuitBreakerConfig) -> Self {
        Self::with_clock(retry_config, breaker_config, SystemClock)
    }
}

impl Default for RecoveryController<SystemClock> {
    fn default() -> Self {
        Self::new(RetryConfig::default(), CircuitBreakerConfig::default())
    }
}

impl<C: ClockSource> RecoveryController<C> {
    pub fn with_clock(retry_config: RetryConfig, breaker_config: CircuitBreakerConfig, clock: C) -> Self {
        let now = clock.now_ms();
        RecoveryController {
            backoff: Backoff::from(&retry_config),
            retry_config,
            clock,
            inner: Mutex::new(Inner {
                errors: BTreeMap::new(),
                breaker: CircuitBreaker::new(breaker_config, now),
                retries: HashMap::new(),
                next_chain: 0,
            }),
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&RecoveryEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Runs `operation` until it succeeds or `max_attempts` invocations fail.
    ///
    /// Rejects immediately with [`Error::CircuitOpen`] without invoking the
    /// operation while the breaker is open. Waits between attempts can be
    /// cancelled with [`clear_error`](Self::clear_error).
    pub async fn retry<T, E, F, Fut>(&self, id: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let now = self.clock.now_ms();
        let (open, transition) = {
            let mut inner = self.lock();
            let transition = inner.breaker.poll(now);
            (inner.breaker.is_open(), transition)
        };
        self.notify_transition(transition);

        if open {
            let error = Error::CircuitOpen { id: id.to_string() };
            tracing::warn!(id, "circuit breaker open, rejecting operation");
            self.fail(id, error.to_string(), Severity::Critical, None, 0, false);
            return Err(error);
        }

        let (chain, token) = self.lock().start_chain(id);

        let max_attempts = self.retry_config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let outcome = operation().await;
            attempt += 1;

            let failure = match outcome {
                Ok(value) => {
                    let transition = {
                        let mut inner = self.lock();
                        inner.errors.remove(id);
                        inner.finish_chain(id, chain);
                        inner.breaker.record_success(self.clock.now_ms())
                    };
                    self.notify_transition(transition);
                    tracing::debug!(id, attempt, "operation succeeded");
                    return Ok(value);
                }
                Err(e) => e.to_string(),
            };

            if attempt >= max_attempts {
                self.lock().finish_chain(id, chain);
                let error = Error::RetriesExhausted {
                    id: id.to_string(),
                    attempts: attempt,
                    last_error: failure,
                };
                self.fail(
                    id,
                    error.to_string(),
                    Severity::Critical,
                    Some(json!({ "retryCount": attempt })),
                    attempt,
                    true,
                );
                return Err(error);
            }

            let delay = self.backoff.delay(attempt - 1);
            let info = self.schedule_retry(id, failure, attempt, delay.as_millis() as u64);
            tracing::info!(
                id,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %info.error,
                "retrying after failure"
            );
            self.listeners.emit(&RecoveryEvent::Retry(info));

            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(id, "retry cancelled");
                    return Err(Error::Cancelled { id: id.to_string() });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// [`retry`](Self::retry) with completion callbacks.
    ///
    /// `on_success` runs once with the result; `on_failure` runs once with
    /// the final error.
    pub async fn retry_with<T, E, F, Fut, S, X>(
        &self,
        id: &str,
        operation: F,
        on_success: S,
        on_failure: X,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
        S: FnOnce(&T),
        X: FnOnce(&Error),
    {
        let result = self.retry(id, operation).await;
        match &result {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
        result
    }

    /// Records a failure that is not retried, e.g. a background load.
    ///
    /// Counts as one breaker failure.
    pub fn record_error(
        &self,
        id: &str,
        error: impl fmt::Display,
        severity: Severity,
        context: Option<Value>,
    ) -> ErrorInfo {
        self.fail(id, error.to_string(), severity, context, 0, true)
    }

    /// Drops the error entry for `id` and cancels every pending retry wait
    /// running under it.
    pub fn clear_error(&self, id: &str) {
        let chains = {
            let mut inner = self.lock();
            inner.errors.remove(id);
            inner.retries.remove(id).unwrap_or_default()
        };
        for (_, token) in chains {
            token.cancel();
        }
    }

    /// Drops every error entry and cancels every pending retry wait.
    pub fn clear_all_errors(&self) {
        let tokens: Vec<CancellationToken> = {
            let mut inner = self.lock();
            inner.errors.clear();
            inner.retries.drain().flat_map(|(_, chains)| chains).map(|(_, token)| token).collect()
        };
        for token in tokens {
            token.cancel();
        }
    }

    /// Forces the breaker closed regardless of history.
    pub fn reset_circuit_breaker(&self) {
        let now = self.clock.now_ms();
        self.lock().breaker.reset(now);
        tracing::info!("circuit breaker reset to closed");
        self.listeners.emit(&RecoveryEvent::CircuitChanged { open: false });
    }

    pub fn error(&self, id: &str) -> Option<ErrorInfo> {
        self.lock().errors.get(id).cloned()
    }

    pub fn all_errors(&self) -> BTreeMap<String, ErrorInfo> {
        self.lock().errors.clone()
    }

    pub fn error_count(&self) -> usize {
        self.lock().errors.len()
    }

    pub fn has_critical_errors(&self) -> bool {
        self.lock().errors.values().any(|e| e.severity == Severity::Critical)
    }

    pub fn is_circuit_breaker_open(&self) -> bool {
        self.lock().breaker.is_open()
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerState {
        self.lock().breaker.snapshot()
    }

    fn schedule_retry(&self, id: &str, error: String, attempt: u32, delay_ms: u64) -> ErrorInfo {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let info = inner.errors.entry(id.to_string()).or_insert_with(|| ErrorInfo {
            id: id.to_string(),
            error: error.clone(),
            severity: Severity::Warning,
            timestamp: now,
            retry_count: 0,
            context: None,
            last_retry_time: None,
            next_retry_time: None,
        });
        info.error = error;
        info.retry_count = attempt;
        info.last_retry_time = Some(now);
        info.next_retry_time = Some(now + delay_ms);
        info.clone()
    }

    fn fail(
        &self,
        id: &str,
        error: String,
        severity: Severity,
        context: Option<Value>,
        retry_count: u32,
        count_failure: bool,
    ) -> ErrorInfo {
        let now = self.clock.now_ms();
        let info = ErrorInfo {
            id: id.to_string(),
            error,
            severity,
            timestamp: now,
            retry_count,
            context,
            last_retry_time: None,
            next_retry_time: None,
        };

        let transition = {
            let mut inner = self.lock();
            inner.errors.insert(id.to_string(), info.clone());
            if count_failure {
                inner.breaker.record_failure(now)
            } else {
                None
            }
        };

        match severity {
            Severity::Critical => tracing::error!(id, error = %info.error, "operation failed"),
            Severity::Warning => tracing::warn!(id, error = %info.error, "operation failed"),
            Severity::Info => tracing::info!(id, error = %info.error, "operation failed"),
        }

        self.notify_transition(transition);
        self.listeners.emit(&RecoveryEvent::Error(info.clone()));
        info
    }

    fn notify_transition(&self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };
        match transition.to {
            CircuitState::Open => {
                tracing::warn!(from = ?transition.from, "circuit breaker opened after repeated failures");
                self.listeners.emit(&RecoveryEvent::CircuitChanged { open: true });
            }
            CircuitState::Closed => {
                tracing::info!("circuit breaker closed after successful recovery");
                self.listeners.emit(&RecoveryEvent::CircuitChanged { open: false });
            }
            CircuitState::HalfOpen => {
                tracing::info!("circuit breaker half-open, probing");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

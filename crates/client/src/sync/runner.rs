// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection runner: keeps a transport connected and feeds the coordinator.
//!
//! The loop:
//! 1. Connects with exponential backoff
//! 2. Sends `Connect` to the coordinator (which drains the offline queue)
//! 3. Forwards every received frame until the connection drops
//! 4. Sends `Disconnect` and starts over
//!
//! Cancelling the token stops the loop between any two steps.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use vzsync_core::{Backoff, ClockSource};

use super::coordinator::{Coordinator, Inbound, SyncError, SyncResult};
use super::transport::Transport;

/// Reconnect policy, the `[reconnect]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Maximum connection attempts per outage (0 = unlimited).
    pub max_retries: u32,
    /// Delay after the first failed attempt (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts (milliseconds).
    pub max_delay_ms: u64,
    /// Spread delays by a random factor in `[0.5, 1.5)`.
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig { max_retries: 10, initial_delay_ms: 100, max_delay_ms: 30_000, jitter: true }
    }
}

impl ReconnectConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay_ms, self.max_delay_ms, 2.0, self.jitter)
    }
}

/// How a connection attempt loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { attempts: u32 },
    Cancelled,
}

/// Connects `transport` to `url`, retrying with exponential backoff.
pub async fn connect_with_retry<T: Transport>(
    transport: &mut T,
    url: &str,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> SyncResult<ConnectOutcome> {
    let backoff = config.backoff();
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Ok(ConnectOutcome::Cancelled);
        }

        attempt = attempt.saturating_add(1);
        tracing::debug!(url, attempt, "connecting");

        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(ConnectOutcome::Cancelled),
            result = transport.connect(url) => result,
        };

        let error = match result {
            Ok(()) => {
                tracing::info!(url, attempt, "connected");
                return Ok(ConnectOutcome::Connected { attempts: attempt });
            }
            Err(e) => e.to_string(),
        };

        if config.max_retries > 0 && attempt >= config.max_retries {
            tracing::warn!(url, attempts = attempt, error = %error, "giving up connecting");
            return Err(SyncError::MaxRetriesExceeded { attempts: attempt, last_error: error });
        }

        let delay: Duration = backoff.delay(attempt - 1);
        tracing::info!(url, attempt, delay_ms = delay.as_millis() as u64, error = %error, "connect failed, retrying");
        tokio::select! {
            _ = cancel.cancelled() => return Ok(ConnectOutcome::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Runs until `cancel` fires or reconnecting gives up.
pub async fn run<T: Transport, C: ClockSource>(
    coordinator: &mut Coordinator<T, C>,
    url: &str,
    config: &ReconnectConfig,
    cancel: CancellationToken,
) -> SyncResult<()> {
    loop {
        match connect_with_retry(coordinator.socket_mut(), url, config, &cancel).await? {
            ConnectOutcome::Connected { .. } => {}
            ConnectOutcome::Cancelled => return Ok(()),
        }
        coordinator.handle_inbound(Inbound::Connect).await;

        let stopped = pump(coordinator, &cancel).await;

        coordinator.handle_inbound(Inbound::Disconnect).await;
        if stopped {
            let _ = coordinator.socket_mut().disconnect().await;
            return Ok(());
        }
    }
}

/// Forwards frames until the connection drops. Returns true if cancelled.
async fn pump<T: Transport, C: ClockSource>(
    coordinator: &mut Coordinator<T, C>,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            result = coordinator.socket_mut().recv() => Some(result),
        };

        match next {
            None => return true,
            Some(Ok(Some(frame))) => {
                coordinator.handle_inbound(Inbound::Event(frame)).await;
            }
            Some(Ok(None)) => {
                tracing::info!("connection closed by server");
                return false;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "connection lost");
                return false;
            }
        }
    }
}

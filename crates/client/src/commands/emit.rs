// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot emission with offline fallback.

use std::path::Path;

use serde_json::Value;
use vzsync_core::RecoveryController;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sync::{Coordinator, EmitOptions, Inbound, OfflineQueue, Transport, WebSocketTransport};

/// What happened to an emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOutcome {
    pub id: String,
    /// Left in the offline queue for a later run.
    pub queued: bool,
    /// Earlier queued events delivered on this connection.
    pub replayed: usize,
}

pub fn run(config: &Config, event: &str, data: &str, optimistic: bool, url: Option<&str>) -> Result<()> {
    let data: Value = serde_json::from_str(data).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    let url = config.server_url(url)?;
    let (queue, queue_path) = super::load_queue(config)?;

    let outcome = super::runtime()?.block_on(emit(
        config,
        &url,
        event,
        data,
        EmitOptions { optimistic },
        queue,
        &queue_path,
    ))?;

    if outcome.queued {
        println!("{} queued (server unreachable)", outcome.id);
    } else {
        println!("{} sent", outcome.id);
    }
    if outcome.replayed > 0 {
        println!("Replayed {} queued event(s)", outcome.replayed);
    }
    Ok(())
}

/// Connects once (with retries), replays the backlog, then emits `data`.
pub async fn emit(
    config: &Config,
    url: &str,
    event: &str,
    data: Value,
    options: EmitOptions,
    queue: OfflineQueue,
    queue_path: &Path,
) -> Result<EmitOutcome> {
    let recovery = RecoveryController::new(config.retry.clone(), config.circuit_breaker.clone());
    let connected = recovery
        .retry("connect", move || async move {
            let mut transport = WebSocketTransport::new();
            let result = transport.connect(url).await;
            result.map(|()| transport)
        })
        .await;

    let transport = match connected {
        Ok(transport) => transport,
        Err(e) => {
            tracing::warn!(error = %e, "server unreachable, queuing offline");
            WebSocketTransport::new()
        }
    };

    let mut coordinator = Coordinator::new(config.sync.clone(), transport).with_offline_queue(queue);
    coordinator.init();

    let backlog = coordinator.offline_queue_len();
    if coordinator.is_connected() {
        coordinator.handle_inbound(Inbound::Connect).await;
    }
    let replayed = backlog.saturating_sub(coordinator.offline_queue_len());

    let id = coordinator.emit_event(event, data, options).await;
    let queued = coordinator
        .offline_queue()
        .get(&id)
        .is_some_and(|item| item.retry_count == 0);

    if coordinator.is_connected() {
        if let Err(e) = coordinator.socket_mut().disconnect().await {
            tracing::debug!(error = %e, "disconnect failed");
        }
    }
    coordinator.offline_queue().persist(queue_path)?;
    coordinator.dispose();

    Ok(EmitOutcome { id, queued, replayed })
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod tests;

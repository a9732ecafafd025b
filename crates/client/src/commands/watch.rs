// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running connection that prints server events.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::sync::{runner, Coordinator, OfflineQueue, SyncEvent, WebSocketTransport};

pub fn run(config: &Config, url: Option<&str>) -> Result<()> {
    let url = config.server_url(url)?;
    let (queue, queue_path) = super::load_queue(config)?;
    super::runtime()?.block_on(watch(config, &url, queue, &queue_path))
}

async fn watch(config: &Config, url: &str, queue: OfflineQueue, queue_path: &Path) -> Result<()> {
    let mut coordinator =
        Coordinator::new(config.sync.clone(), WebSocketTransport::new()).with_offline_queue(queue);
    coordinator.init();
    coordinator.subscribe(print_event);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, shutting down");
            trigger.cancel();
        }
    });

    let result = runner::run(&mut coordinator, url, &config.reconnect, cancel).await;

    // Persist even when reconnecting gave up so queued work survives.
    coordinator.offline_queue().persist(queue_path)?;
    let conflicted = coordinator.conflicted_changes().len();
    if conflicted > 0 {
        tracing::warn!(count = conflicted, "dropping conflicted changes that were not resolved");
    }
    coordinator.dispose();

    result?;
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
    }
}

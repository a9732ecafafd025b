// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod emit;
pub mod queue;
pub mod watch;

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::sync::OfflineQueue;

/// Loads the persisted offline queue named by the config.
pub fn load_queue(config: &Config) -> Result<(OfflineQueue, PathBuf)> {
    let path = config.queue_path()?;
    let queue = OfflineQueue::load(&path, config.sync.offline_queue_size)?;
    tracing::debug!(path = %path.display(), items = queue.len(), "loaded offline queue");
    Ok((queue, path))
}

/// Runtime for commands that talk to the server.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread().enable_all().build()?)
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sync::OfflineQueue;

pub fn run(config: &Config, clear: bool) -> Result<()> {
    let (mut queue, path) = super::load_queue(config)?;

    if clear {
        let count = queue.clear();
        queue.persist(&path)?;
        println!("Cleared {} queued event(s)", count);
        return Ok(());
    }

    for line in render(&queue)? {
        println!("{}", line);
    }
    Ok(())
}

/// One JSON line per queued event, oldest first.
pub fn render(queue: &OfflineQueue) -> Result<Vec<String>> {
    if queue.is_empty() {
        return Ok(vec!["Offline queue is empty".to_string()]);
    }
    queue
        .iter()
        .map(|item| serde_json::to_string(item).map_err(|e| Error::Queue(e.into())))
        .collect()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

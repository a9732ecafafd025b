// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded offline queue for events emitted while disconnected.
//!
//! The queue lives in memory and drains FIFO. When it is full the oldest
//! item is dropped to make room, never the newest. It can be persisted as
//! JSONL (one item per line, fsynced) so a restarted client keeps its
//! offline work.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// An emission waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineQueueItem {
    /// Event id, also sent to the server as `eventId`.
    pub id: String,
    pub event: String,
    /// Payload as given by the host, without `eventId`.
    pub data: Value,
    /// When the item was queued (ms).
    pub timestamp: u64,
    /// Delivery attempts made so far.
    #[serde(default)]
    pub retry_count: u32,
}

/// FIFO queue holding at most `capacity` items.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineQueue {
    items: VecDeque<OfflineQueueItem>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Self {
        OfflineQueue { items: VecDeque::new(), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an item, returning the entry dropped to stay within capacity.
    pub fn push(&mut self, item: OfflineQueueItem) -> Option<OfflineQueueItem> {
        if self.capacity == 0 {
            return Some(item);
        }
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Appends an item that was already sent once and awaits confirmation.
    ///
    /// When full, only another sent item (`retry_count > 0`) is evicted to
    /// make room. If every queued item is still unsent, `item` itself is
    /// returned and not queued.
    pub fn push_sent(&mut self, item: OfflineQueueItem) -> Option<OfflineQueueItem> {
        if self.items.len() < self.capacity {
            self.items.push_back(item);
            return None;
        }
        match self.items.iter().position(|queued| queued.retry_count > 0) {
            Some(index) => {
                let evicted = self.items.remove(index);
                self.items.push_back(item);
                evicted
            }
            None => Some(item),
        }
    }

    pub fn get(&self, id: &str) -> Option<&OfflineQueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<OfflineQueueItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.items.remove(index)
    }

    /// Bumps the delivery attempt count, returning the new value.
    pub fn increment_retry(&mut self, id: &str) -> Option<u32> {
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        item.retry_count = item.retry_count.saturating_add(1);
        Some(item.retry_count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfflineQueueItem> {
        self.items.iter()
    }

    /// Copies the queue in FIFO order.
    pub fn to_vec(&self) -> Vec<OfflineQueueItem> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes every item, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    /// Writes the queue to `path` as JSONL, replacing any previous content.
    pub fn persist(&self, path: &Path) -> QueueResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        for item in &self.items {
            let json = serde_json::to_string(item)?;
            writeln!(file, "{}", json)?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Reads a queue written by [`persist`](Self::persist).
    ///
    /// A missing file yields an empty queue. If the file holds more than
    /// `capacity` items only the newest are kept.
    pub fn load(path: &Path, capacity: usize) -> QueueResult<Self> {
        let mut queue = OfflineQueue::new(capacity);

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(queue);
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let item: OfflineQueueItem = serde_json::from_str(&line)?;
            if let Some(dropped) = queue.push(item) {
                tracing::warn!(id = %dropped.id, "persisted queue over capacity, dropping oldest");
            }
        }

        Ok(queue)
    }
}

impl Default for OfflineQueue {
    fn default() -> Self {
        OfflineQueue::new(super::coordinator::DEFAULT_OFFLINE_QUEUE_SIZE)
    }
}

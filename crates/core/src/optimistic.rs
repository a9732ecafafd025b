// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic state store.
//!
//! Holds one value plus the ledger of in-flight mutations that have been
//! applied locally but not yet confirmed by the server.
//!
//! Rules:
//! - Every pending update keeps the snapshot taken when it was applied.
//!   Rolling it back restores that snapshot, never a re-derived value.
//! - Committing folds the update into the state permanently.
//! - Commit and rollback on an id that is not pending are no-ops.
//! - A batch shares a single pre-batch snapshot across all of its entries.

use std::sync::Arc;

use serde_json::Value;

use crate::clock::{ClockSource, SystemClock};
use crate::listeners::{ListenerId, Listeners};

/// One in-flight, unconfirmed mutation.
#[derive(Debug)]
pub struct OptimisticUpdate<T> {
    /// Caller-supplied unique id, e.g. `save_playlist_42_1712000000000`.
    pub id: String,
    /// State immediately before this update was applied.
    pub previous_state: Arc<T>,
    /// State immediately after this update was applied.
    pub optimistic_state: Arc<T>,
    /// Wall clock time (ms) when the update was applied.
    pub timestamp: u64,
    pub metadata: Option<Value>,
}

impl<T> Clone for OptimisticUpdate<T> {
    fn clone(&self) -> Self {
        OptimisticUpdate {
            id: self.id.clone(),
            previous_state: Arc::clone(&self.previous_state),
            optimistic_state: Arc::clone(&self.optimistic_state),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// Notifications emitted by [`OptimisticStore`].
#[derive(Debug, Clone)]
pub enum StoreEvent<T> {
    Committed(OptimisticUpdate<T>),
    RolledBack(OptimisticUpdate<T>),
}

type Updater<T> = Box<dyn FnOnce(&T) -> T + Send>;

/// One entry of [`OptimisticStore::batch_update`].
pub struct BatchUpdate<T> {
    id: String,
    updater: Updater<T>,
    metadata: Option<Value>,
}

impl<T> BatchUpdate<T> {
    pub fn new<F>(id: impl Into<String>, updater: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        BatchUpdate { id: id.into(), updater: Box::new(updater), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A value with apply/commit/rollback semantics for optimistic UI updates.
pub struct OptimisticStore<T, C: ClockSource = SystemClock> {
    state: Arc<T>,
    /// Pending updates in application order.
    pending: Vec<OptimisticUpdate<T>>,
    clock: C,
    listeners: Listeners<StoreEvent<T>>,
}

impl<T> OptimisticStore<T, SystemClock> {
    pub fn new(initial: T) -> Self {
        Self::with_clock(initial, SystemClock)
    }
}

impl<T, C: ClockSource> OptimisticStore<T, C> {
    pub fn with_clock(initial: T, clock: C) -> Self {
        OptimisticStore {
            state: Arc::new(initial),
            pending: Vec::new(),
            clock,
            listeners: Listeners::new(),
        }
    }

    /// Current state, including every pending update.
    pub fn state(&self) -> &T {
        &self.state
    }

    /// Captures the current state as a shareable snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.state)
    }

    /// Registers a commit/rollback listener.
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&StoreEvent<T>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Applies `updater` to the current state and records it as pending.
    ///
    /// Reusing an id that is still pending replaces that entry in place.
    pub fn update_optimistic<F>(&mut self, id: impl Into<String>, updater: F, metadata: Option<Value>)
    where
        F: FnOnce(&T) -> T,
    {
        let id = id.into();
        let previous = self.snapshot();
        let next = Arc::new(updater(&*previous));
        self.state = Arc::clone(&next);

        tracing::debug!(id = %id, pending = self.pending.len() + 1, "optimistic update applied");
        self.record(OptimisticUpdate {
            id,
            previous_state: previous,
            optimistic_state: next,
            timestamp: self.clock.now_ms(),
            metadata,
        });
    }

    /// Applies several updaters in order from one shared snapshot.
    ///
    /// Rolling back any id of the batch restores the pre-batch state.
    pub fn batch_update(&mut self, updates: Vec<BatchUpdate<T>>) {
        if updates.is_empty() {
            return;
        }

        let previous = self.snapshot();
        let timestamp = self.clock.now_ms();
        let count = updates.len();

        for BatchUpdate { id, updater, metadata } in updates {
            let next = Arc::new(updater(&*self.state));
            self.state = Arc::clone(&next);
            self.record(OptimisticUpdate {
                id,
                previous_state: Arc::clone(&previous),
                optimistic_state: next,
                timestamp,
                metadata,
            });
        }

        tracing::debug!(count, pending = self.pending.len(), "optimistic batch applied");
    }

    /// Confirms a pending update. The current state is left untouched.
    ///
    /// Returns false if `id` was not pending.
    pub fn commit_optimistic(&mut self, id: &str) -> bool {
        let Some(update) = self.take(id) else {
            return false;
        };

        tracing::debug!(id = %id, "optimistic update committed");
        self.listeners.emit(&StoreEvent::Committed(update));
        true
    }

    /// Reverts a pending update to `fallback`, or to its recorded snapshot.
    ///
    /// Returns false if `id` was not pending.
    pub fn rollback_optimistic(&mut self, id: &str, fallback: Option<T>) -> bool {
        let Some(update) = self.take(id) else {
            return false;
        };

        self.state = match fallback {
            Some(state) => Arc::new(state),
            None => Arc::clone(&update.previous_state),
        };

        tracing::info!(id = %id, "optimistic update rolled back");
        self.listeners.emit(&StoreEvent::RolledBack(update));
        true
    }

    /// Reverts every pending update to the oldest recorded snapshot.
    ///
    /// Returns the number of updates rolled back.
    pub fn rollback_all(&mut self) -> usize {
        let Some(oldest) = self.pending.first() else {
            return 0;
        };

        self.state = Arc::clone(&oldest.previous_state);
        let rolled_back = std::mem::take(&mut self.pending);
        let count = rolled_back.len();

        tracing::warn!(count, "rolled back all pending optimistic updates");
        for update in rolled_back {
            self.listeners.emit(&StoreEvent::RolledBack(update));
        }
        count
    }

    pub fn pending_update(&self, id: &str) -> Option<&OptimisticUpdate<T>> {
        self.pending.iter().find(|u| u.id == id)
    }

    /// Pending updates in application order.
    pub fn update_queue(&self) -> &[OptimisticUpdate<T>] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    fn record(&mut self, update: OptimisticUpdate<T>) {
        match self.pending.iter_mut().find(|u| u.id == update.id) {
            Some(existing) => *existing = update,
            None => self.pending.push(update),
        }
    }

    fn take(&mut self, id: &str) -> Option<OptimisticUpdate<T>> {
        let index = self.pending.iter().position(|u| u.id == id)?;
        Some(self.pending.remove(index))
    }
}

#[cfg(test)]
#[path = "optimistic_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic mutations backed by a retried request.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::clock::ClockSource;
use crate::error::Result;
use crate::optimistic::OptimisticStore;
use crate::recovery::RecoveryController;

/// Applies `updater` optimistically, then runs `operation` under
/// [`RecoveryController::retry`] with the same id.
///
/// The update is committed when the operation eventually succeeds and
/// rolled back to its recorded previous state when the retry chain fails,
/// is rejected by the circuit breaker, or is cancelled. The store lock is
/// only held while the store itself is touched.
pub async fn apply_with_retry<T, SC, RC, U, F, Fut, V, E>(
    store: &Mutex<OptimisticStore<T, SC>>,
    recovery: &RecoveryController<RC>,
    id: &str,
    updater: U,
    operation: F,
) -> Result<V>
where
    SC: ClockSource,
    RC: ClockSource,
    U: FnOnce(&T) -> T,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
    E: fmt::Display,
{
    lock(store).update_optimistic(id, updater, None);

    let result = recovery.retry(id, operation).await;

    let mut store = lock(store);
    match &result {
        Ok(_) => {
            store.commit_optimistic(id);
        }
        Err(error) => {
            tracing::warn!(id, error = %error, "rolling back optimistic update");
            store.rollback_optimistic(id, None);
        }
    }
    result
}

fn lock<T, C: ClockSource>(store: &Mutex<OptimisticStore<T, C>>) -> MutexGuard<'_, OptimisticStore<T, C>> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;

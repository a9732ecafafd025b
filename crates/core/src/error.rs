// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for vzsync-core operations.

use thiserror::Error;

/// Errors surfaced by the recovery layer.
///
/// Single failed attempts never show up here; they are absorbed by
/// [`RecoveryController::retry`](crate::recovery::RecoveryController::retry)
/// and reported through retry events instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("circuit breaker is open, rejecting '{id}'\n  hint: too many failures, wait for the cooldown or reset the breaker")]
    CircuitOpen { id: String },

    #[error("max retry attempts ({attempts}) exceeded for '{id}': {last_error}")]
    RetriesExhausted {
        id: String,
        attempts: u32,
        last_error: String,
    },

    #[error("retry cancelled for '{id}'")]
    Cancelled { id: String },
}

impl Error {
    /// Returns the operation id the error refers to.
    pub fn id(&self) -> &str {
        match self {
            Error::CircuitOpen { id } | Error::RetriesExhausted { id, .. } | Error::Cancelled { id } => {
                id
            }
        }
    }

    /// Returns true if the operation was never invoked because the breaker was open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::CircuitOpen { .. })
    }
}

/// A specialized Result type for vzsync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

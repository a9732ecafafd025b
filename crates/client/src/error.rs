// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{QueueError, SyncError, TransportError};

/// Errors surfaced by the vzsync binary and its library entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config file {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("no server url configured\n  hint: pass --url or set `url` in the config file")]
    MissingUrl,

    #[error("invalid JSON payload: {0}\n  hint: quote the payload, e.g. '{{\"deviceId\": \"d1\"}}'")]
    InvalidPayload(String),

    #[error(transparent)]
    Recovery(#[from] vzsync_core::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! vzsync - realtime sync client with an offline queue.
//!
//! This crate wires the primitives from `vzsync-core` to a named-event
//! WebSocket and provides the `vzsync` command line tool.
//!
//! # Main Components
//!
//! - [`sync::Coordinator`] - reconciles optimistic emissions, server pushes
//!   and the offline backlog
//! - [`sync::OfflineQueue`] - bounded FIFO queue, persisted as JSONL
//! - [`sync::runner`] - reconnect loop feeding the coordinator
//! - [`Config`] - TOML configuration
//!
//! ```rust,ignore
//! use vzsync::sync::{Coordinator, EmitOptions, SyncConfig, WebSocketTransport};
//!
//! let mut coordinator = Coordinator::new(SyncConfig::default(), WebSocketTransport::new());
//! coordinator.init();
//! coordinator.subscribe(|event| println!("{event:?}"));
//! let id = coordinator.emit_event("device:update", payload, EmitOptions::optimistic()).await;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{Error, Result};

/// Execute a CLI command against a loaded config.
pub fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Watch { url } => commands::watch::run(config, url.as_deref()),
        Command::Emit { event, data, optimistic, url } => {
            commands::emit::run(config, &event, &data, optimistic, url.as_deref())
        }
        Command::Queue { clear } => commands::queue::run(config, clear),
    }
}

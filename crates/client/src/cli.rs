// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vzsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Realtime sync client with an offline queue")]
#[command(
    long_about = "Realtime sync client with an offline queue.\n\n\
    Events emitted while the server is unreachable are queued on disk and \
    replayed in order once a connection is established."
)]
pub struct Cli {
    /// Config file (default: $VZSYNC_CONFIG, then the per-user config dir)
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Stay connected and print server events as JSON lines
    #[command(after_help = "\
Examples:
  vzsync watch                           Use the url from the config file
  vzsync watch --url ws://localhost:7000 Connect to a local server")]
    Watch {
        /// Server URL (overrides the config file)
        #[arg(long)]
        url: Option<String>,
    },

    /// Send one event, queuing it if the server is unreachable
    #[command(after_help = "\
Examples:
  vzsync emit device:update '{\"deviceId\": \"d1\", \"status\": \"online\"}'
  vzsync emit playlist:update '{\"playlistId\": \"p1\"}' --optimistic")]
    Emit {
        /// Event name
        event: String,

        /// JSON payload
        data: String,

        /// Track as a pending change until the server confirms it
        #[arg(long)]
        optimistic: bool,

        /// Server URL (overrides the config file)
        #[arg(long)]
        url: Option<String>,
    },

    /// Show or clear the persisted offline queue
    Queue {
        /// Drop every queued event
        #[arg(long)]
        clear: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

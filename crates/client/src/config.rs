// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Stored as TOML, by default in `<config dir>/vzsync/config.toml`:
//!
//! ```toml
//! url = "wss://realtime.example.com/socket"
//!
//! [sync]
//! offline_queue_size = 100
//! delivery = "acknowledged"
//!
//! [reconnect]
//! max_retries = 0
//! ```
//!
//! Every table is optional; omitted fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vzsync_core::{CircuitBreakerConfig, RetryConfig};

use crate::error::{Error, Result};
use crate::sync::{ReconnectConfig, SyncConfig};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VZSYNC_CONFIG";

const APP_DIR_NAME: &str = "vzsync";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_FILE_NAME: &str = "queue.jsonl";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Realtime server, `ws://` or `wss://`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Where the offline queue is persisted between runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_path: Option<PathBuf>,
    /// Log file; logs go to stderr when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    pub sync: SyncConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub reconnect: ReconnectConfig,
}

/// A config file location and whether it has to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    /// Named by the user (flag or environment) rather than defaulted.
    pub explicit: bool,
}

/// Picks the config file: `--config`, then `$VZSYNC_CONFIG`, then the
/// per-user default. `None` when no config directory is known.
pub fn config_location(flag: Option<&Path>, env: Option<&str>) -> Option<ConfigLocation> {
    if let Some(path) = flag {
        return Some(ConfigLocation { path: path.to_path_buf(), explicit: true });
    }
    if let Some(path) = env.filter(|p| !p.trim().is_empty()) {
        return Some(ConfigLocation { path: PathBuf::from(path), explicit: true });
    }
    dirs::config_dir().map(|dir| ConfigLocation {
        path: dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME),
        explicit: false,
    })
}

impl Config {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content, path)
    }

    /// Loads the config named by `flag` or the environment, or the default
    /// file. A missing default file yields the defaults; a missing explicit
    /// one is an error.
    pub fn discover(flag: Option<&Path>) -> Result<Self> {
        let env = std::env::var(CONFIG_ENV).ok();
        let Some(location) = config_location(flag, env.as_deref()) else {
            tracing::debug!("no config directory, using defaults");
            return Ok(Config::default());
        };

        if !location.explicit && !location.path.exists() {
            tracing::debug!(path = %location.path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let config = Self::load(&location.path)?;
        tracing::debug!(path = %location.path.display(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// The server URL, preferring `override_url`.
    pub fn server_url(&self, override_url: Option<&str>) -> Result<String> {
        let url = override_url.or(self.url.as_deref()).ok_or(Error::MissingUrl)?;
        if let Some(message) = validate_url(url) {
            return Err(Error::Config(message));
        }
        Ok(url.to_string())
    }

    /// Where the offline queue lives.
    pub fn queue_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.queue_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(QUEUE_FILE_NAME))
            .ok_or_else(|| Error::Config("cannot determine data directory, set queue_path".to_string()))
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Returns an error message if `url` is not a WebSocket URL.
pub fn validate_url(url: &str) -> Option<String> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        return None;
    }
    Some(format!("invalid server URL '{}': must be ws:// or wss://", url))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

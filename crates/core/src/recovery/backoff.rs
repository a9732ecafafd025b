// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

use super::config::RetryConfig;

/// Delay policy shared by operation retries and socket reconnects.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    pub fn new(initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64, jitter: bool) -> Self {
        Backoff { initial_delay_ms, max_delay_ms, multiplier, jitter }
    }

    /// Delay ceiling before jitter for the 0-based `attempt`.
    ///
    /// `min(initial * multiplier^attempt, max)`
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let exponential = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = exponential.min(self.max_delay_ms as f64);
        if capped.is_finite() && capped > 0.0 {
            capped as u64
        } else {
            0
        }
    }

    /// Delay to wait after the 0-based `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Same as [`delay`](Self::delay) with a caller-supplied random source.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay_ms(attempt) as f64;
        let scaled = if self.jitter { base * rng.gen_range(0.5..1.5) } else { base };
        Duration::from_millis(scaled.floor() as u64)
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(config: &RetryConfig) -> Self {
        Backoff::new(
            config.initial_delay_ms,
            config.max_delay_ms,
            config.backoff_multiplier,
            config.jitter,
        )
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::from(&RetryConfig::default())
    }
}

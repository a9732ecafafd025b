// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the backoff policy.

#![allow(clippy::unwrap_used)]

use super::{Backoff, RetryConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use yare::parameterized;

fn no_jitter() -> Backoff {
    Backoff::new(1000, 30_000, 2.0, false)
}

#[parameterized(
    first = { 0, 1000 },
    second = { 1, 2000 },
    third = { 2, 4000 },
    fifth = { 4, 16_000 },
    capped = { 5, 30_000 },
    far_past_cap = { 40, 30_000 },
)]
fn delay_without_jitter_is_exact(attempt: u32, expected_ms: u64) {
    assert_eq!(no_jitter().delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn jittered_delay_stays_within_bounds() {
    let backoff = Backoff::new(1000, 30_000, 2.0, true);
    let mut rng = StdRng::seed_from_u64(7);

    for attempt in 0..8 {
        let base = backoff.base_delay_ms(attempt);
        for _ in 0..200 {
            let ms = backoff.delay_with(attempt, &mut rng).as_millis() as u64;
            assert!(ms >= base / 2, "attempt {attempt}: {ms} < {}", base / 2);
            assert!(ms < base + base / 2, "attempt {attempt}: {ms} >= 1.5 * {base}");
        }
    }
}

#[test]
fn jitter_spreads_delays() {
    let backoff = Backoff::new(1000, 30_000, 2.0, true);
    let mut rng = StdRng::seed_from_u64(42);

    let samples: Vec<Duration> = (0..20).map(|_| backoff.delay_with(0, &mut rng)).collect();
    let first = samples[0];
    assert!(samples.iter().any(|d| *d != first));
}

#[test]
fn from_retry_config_uses_defaults() {
    let backoff = Backoff::from(&RetryConfig { jitter: false, ..RetryConfig::default() });
    assert_eq!(backoff.delay(0), Duration::from_millis(1000));
    assert_eq!(backoff.delay(1), Duration::from_millis(2000));
}

#[test]
fn zero_initial_delay_never_waits() {
    let backoff = Backoff::new(0, 30_000, 2.0, true);
    assert_eq!(backoff.delay(3), Duration::ZERO);
}

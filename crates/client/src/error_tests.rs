// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    missing_url = { Error::MissingUrl, "hint: pass --url" },
    payload = { Error::InvalidPayload("expected value".into()), "invalid JSON payload: expected value" },
    config = { Error::Config("no config dir".into()), "config error: no config dir" },
    not_connected = { Error::Sync(SyncError::NotConnected), "not connected" },
)]
fn error_messages(error: Error, expected: &str) {
    let message = error.to_string();
    assert!(message.contains(expected), "{message:?} does not contain {expected:?}");
}

#[test]
fn io_errors_convert() {
    let error: Error = std::io::Error::other("disk gone").into();
    assert!(matches!(error, Error::Io(_)));
}

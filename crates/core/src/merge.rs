// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between a local optimistic payload and a server push.
//!
//! Merge rules:
//! - Both objects: shallow merge, remote keys win
//! - `_localTimestamp` is taken from the local side, `_remoteTimestamp` from the remote side
//! - Anything else: the remote value replaces the local one
//!
//! The server is authoritative; the local side only contributes keys the
//! remote payload does not mention.

use serde_json::{Map, Value};

/// Marker carrying the local edit time through a merge.
pub const LOCAL_TIMESTAMP: &str = "_localTimestamp";

/// Marker carrying the server edit time through a merge.
pub const REMOTE_TIMESTAMP: &str = "_remoteTimestamp";

/// Merges `local` and `remote`, remote winning on every shared key.
pub fn resolve_conflict(local: &Value, remote: &Value) -> Value {
    let (Value::Object(local), Value::Object(remote)) = (local, remote) else {
        return remote.clone();
    };

    let mut merged: Map<String, Value> = local.clone();
    for (key, value) in remote {
        merged.insert(key.clone(), value.clone());
    }

    // Markers reflect their own side only, even if the other side carried one.
    merged.remove(LOCAL_TIMESTAMP);
    merged.remove(REMOTE_TIMESTAMP);
    if let Some(ts) = local.get(LOCAL_TIMESTAMP) {
        merged.insert(LOCAL_TIMESTAMP.to_string(), ts.clone());
    }
    if let Some(ts) = remote.get(REMOTE_TIMESTAMP) {
        merged.insert(REMOTE_TIMESTAMP.to_string(), ts.clone());
    }

    Value::Object(merged)
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket event names and payloads.
//!
//! Payloads only type their identity fields; everything else the server
//! sends is kept verbatim in `extra` so it survives a round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server push: a device went online or offline.
pub const DEVICE_STATUS_UPDATE: &str = "device:status-update";
/// Server push: a playlist was created, changed or deleted.
pub const PLAYLIST_UPDATED: &str = "playlist:updated";
/// Server push: a device reported a health problem.
pub const HEALTH_ALERT: &str = "health:alert";
/// Server push: a schedule started, completed or failed.
pub const SCHEDULE_EXECUTED: &str = "schedule:executed";
/// Server acknowledgment of a client emission, carrying its `eventId`.
pub const SYNC_ACK: &str = "sync:ack";

/// Client emission: device change.
pub const DEVICE_UPDATE: &str = "device:update";
/// Client emission: playlist change.
pub const PLAYLIST_UPDATE: &str = "playlist:update";
/// Client emission: schedule change.
pub const SCHEDULE_UPDATE: &str = "schedule:update";

/// Events the coordinator subscribes to on the socket.
pub const INBOUND_EVENTS: [&str; 5] =
    [DEVICE_STATUS_UPDATE, PLAYLIST_UPDATED, HEALTH_ALERT, SCHEDULE_EXECUTED, SYNC_ACK];

/// Key added to every emitted payload.
pub const EVENT_ID: &str = "eventId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusUpdate {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistUpdate {
    pub playlist_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAlert {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleExecution {
    pub schedule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a [`SYNC_ACK`] frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAck {
    pub event_id: String,
}

/// Attaches `eventId` to an outgoing payload.
///
/// Objects gain the key; any other value is wrapped as `{"data": v, "eventId": id}`.
pub fn with_event_id(data: &Value, event_id: &str) -> Value {
    let mut object = match data {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other.clone());
            map
        }
    };
    object.insert(EVENT_ID.to_string(), Value::String(event_id.to_string()));
    Value::Object(object)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

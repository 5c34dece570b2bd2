//! Wire payload definitions
//!
//! Defines the payload structures carried in the `data` field of gateway
//! envelopes, in both directions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Prefix of every workspace room id
pub const ROOM_ID_PREFIX: &str = "workspace:";

/// Build a room id for a workspace
#[must_use]
pub fn workspace_room_id(workspace_id: &str) -> String {
    format!("{ROOM_ID_PREFIX}{workspace_id}")
}

/// Check whether a change code key names a workspace trickle event
///
/// Matching keys have exactly three `:`-separated segments:
/// `workspace`, a decimal workspace id, and `trickle`.
#[must_use]
pub fn is_workspace_trickle_key(key: &str) -> bool {
    let parts: Vec<&str> = key.split(':').collect();
    match parts.as_slice() {
        ["workspace", id, "trickle"] => {
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Session parameters dictated by the server in `connect_success`
///
/// All intervals are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub connection_id: String,
    pub hello_interval: u64,
    pub dead_interval: u64,
    pub max_retry_connection: u32,
    pub retry_connection_interval: u64,
    pub room_status_hello_interval: u64,
    pub room_status_dead_interval: u64,
    pub join_room_max_retry_counts: u32,
    pub join_room_max_retry_interval: u64,
    pub list_room_interval: u64,
}

impl SessionParams {
    #[must_use]
    pub fn hello_interval(&self) -> Duration {
        Duration::from_secs(self.hello_interval)
    }

    #[must_use]
    pub fn dead_interval(&self) -> Duration {
        Duration::from_secs(self.dead_interval)
    }

    #[must_use]
    pub fn retry_connection_interval(&self) -> Duration {
        Duration::from_secs(self.retry_connection_interval)
    }

    #[must_use]
    pub fn room_status_hello_interval(&self) -> Duration {
        Duration::from_secs(self.room_status_hello_interval)
    }

    #[must_use]
    pub fn room_status_dead_interval(&self) -> Duration {
        Duration::from_secs(self.room_status_dead_interval)
    }
}

/// Payload of a `connect_hello` keep-alive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    pub user_id: String,
}

/// Payload of a `connect_hello_ack`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloAckPayload {
    pub conn_id: String,
}

/// Presence status carried by room frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Payload of `join_room`, `room_status`, and `leave_room`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatusPayload {
    pub room_id: String,
    pub member_id: String,
    pub status: PresenceStatus,
}

impl RoomStatusPayload {
    /// Presence declaration for `join_room` and `room_status`
    #[must_use]
    pub fn online(room_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            member_id: member_id.into(),
            status: PresenceStatus::Online,
        }
    }

    /// Presence withdrawal for `leave_room`
    #[must_use]
    pub fn offline(room_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            member_id: member_id.into(),
            status: PresenceStatus::Offline,
        }
    }
}

/// One element of a `room_members` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembersEntry {
    /// Room id to full member roster
    pub all: HashMap<String, Vec<String>>,
    pub update: RoomMembersUpdate,
}

/// The roster delta that produced a `room_members` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembersUpdate {
    pub member_id: String,
    pub room_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One element of a `change_notify` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotifyEntry {
    /// Change code key to change metadata
    pub codes: HashMap<String, ChangeCode>,
}

impl ChangeNotifyEntry {
    /// Check whether any code key names a workspace trickle event
    #[must_use]
    pub fn has_trickle_change(&self) -> bool {
        self.codes.keys().any(|key| is_workspace_trickle_key(key))
    }
}

/// Metadata attached to one change code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCode {
    pub version: i64,
    pub latest_change_event: LatestChangeEvent,
    pub trigger: ChangeTrigger,
}

/// The most recent event recorded for a change code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestChangeEvent {
    pub event: String,
}

/// The trace that triggered a change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTrigger {
    pub trickle_trace_id: String,
}

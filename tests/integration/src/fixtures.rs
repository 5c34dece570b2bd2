//! Canned gateway frames
//!
//! Server-side frames the mock gateway replays at the client, shaped
//! exactly as the production gateway emits them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Map, Value};

/// Counter for unique frame ids
static COUNTER: AtomicU64 = AtomicU64::new(1);

fn frame_id() -> String {
    format!("srv-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// `connect_success` with the given timings.
///
/// The room presence refresh interval is pinned to one second so tests can
/// observe `room_status` traffic quickly.
pub fn connect_success_frame(connection_id: &str, hello_secs: u64, dead_secs: u64) -> Value {
    connect_success_with_retry(connection_id, hello_secs, dead_secs, 0)
}

/// `connect_success` that also dictates a reconnect pause
pub fn connect_success_with_retry(
    connection_id: &str,
    hello_secs: u64,
    dead_secs: u64,
    retry_secs: u64,
) -> Value {
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "connect_success",
        "data": [{
            "connectionId": connection_id,
            "helloInterval": hello_secs,
            "deadInterval": dead_secs,
            "maxRetryConnection": 5,
            "retryConnectionInterval": retry_secs,
            "roomStatusHelloInterval": 1,
            "roomStatusDeadInterval": 60,
            "joinRoomMaxRetryCounts": 3,
            "joinRoomMaxRetryInterval": 10,
            "listRoomInterval": 120,
        }],
    })
}

/// `connect_hello_ack` for the given connection
pub fn hello_ack_frame(conn_id: &str) -> Value {
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "connect_hello_ack",
        "data": { "connId": conn_id },
    })
}

/// Bare `join_room_ack`
pub fn join_room_ack_frame() -> Value {
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "join_room_ack",
    })
}

/// Bare `sync` hint
pub fn sync_frame() -> Value {
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "sync",
    })
}

/// `room_members` roster snapshot for one room
pub fn room_members_frame(room_id: &str, members: &[&str]) -> Value {
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "room_members",
        "data": [{
            "all": { room_id: members },
            "update": {
                "memberId": members.first().copied().unwrap_or(""),
                "roomId": room_id,
                "type": "join",
            },
        }],
    })
}

/// `change_notify` carrying one entry with the given change-code keys
pub fn change_notify_frame(codes: &[&str]) -> Value {
    let mut map = Map::new();
    for code in codes {
        map.insert(
            (*code).to_string(),
            json!({
                "version": 3,
                "latestChangeEvent": { "event": "update" },
                "trigger": { "trickleTraceId": "trace-1" },
            }),
        );
    }
    json!({
        "id": frame_id(),
        "action": "message",
        "path": "change_notify",
        "data": [{ "codes": map }],
    })
}

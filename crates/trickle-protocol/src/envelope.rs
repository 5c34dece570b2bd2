//! Gateway envelope format
//!
//! Every frame in either direction is one JSON envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::paths::{Action, Path};
use crate::payloads::{HelloPayload, RoomStatusPayload};

/// Gateway envelope format
///
/// All messages sent over the WebSocket connection follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Fresh random identifier per message
    pub id: String,

    /// `Bearer <token>` when credentials are attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// Envelope action; this client always sends `message`
    pub action: Action,

    /// Message type discriminator
    pub path: Path,

    /// Message payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    fn message(path: Path, data: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            authorization: None,
            action: Action::Message,
            path,
            data,
        }
    }

    // === Client Messages ===

    /// Create a `connect` message (empty payload)
    #[must_use]
    pub fn connect() -> Self {
        Self::message(Path::Connect, None)
    }

    /// Create a `connect_hello` keep-alive for a user
    #[must_use]
    pub fn connect_hello(user_id: impl Into<String>) -> Self {
        let payload = HelloPayload {
            user_id: user_id.into(),
        };
        Self::message(
            Path::ConnectHello,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a `join_room` message declaring online presence
    #[must_use]
    pub fn join_room(room_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        let payload = RoomStatusPayload::online(room_id, member_id);
        Self::message(
            Path::JoinRoom,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a `room_status` presence refresh
    #[must_use]
    pub fn room_status(room_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        let payload = RoomStatusPayload::online(room_id, member_id);
        Self::message(
            Path::RoomStatus,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a `leave_room` message declaring offline presence
    #[must_use]
    pub fn leave_room(room_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        let payload = RoomStatusPayload::offline(room_id, member_id);
        Self::message(
            Path::LeaveRoom,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Attach a bearer authorization to this message
    #[must_use]
    pub fn with_authorization(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {token}"));
        self
    }

    // === Parsing Client Messages ===

    /// Try to parse the payload of a `connect_hello`
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.path != Path::ConnectHello {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse the payload of a room presence message
    ///
    /// Valid for `join_room`, `room_status`, and `leave_room`.
    pub fn as_room_status(&self) -> Option<RoomStatusPayload> {
        if !matches!(
            self.path,
            Path::JoinRoom | Path::RoomStatus | Path::LeaveRoom
        ) {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    // === Utilities ===

    /// Check if this is a valid client message
    #[must_use]
    pub fn is_valid_client_message(&self) -> bool {
        self.path.is_client_path()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(path={}, id={})", self.path, self.id)
    }
}

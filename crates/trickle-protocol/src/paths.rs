//! Gateway message paths
//!
//! Every frame carries a `path` field naming the message type; this is the
//! discriminator the codec dispatches on.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway message paths
///
/// Paths define the type of message being sent or received over the
/// WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    /// Open a session (client only)
    Connect,
    /// Periodic keep-alive (client only)
    ConnectHello,
    /// Declare presence in a room (client only)
    JoinRoom,
    /// Refresh room presence (client only)
    RoomStatus,
    /// Withdraw presence from a room (client only)
    LeaveRoom,
    /// Session established, carries session parameters (server only)
    ConnectSuccess,
    /// Keep-alive acknowledged (server only)
    ConnectHelloAck,
    /// Room join acknowledged (server only)
    JoinRoomAck,
    /// Room roster snapshot/update (server only)
    RoomMembers,
    /// Cache refresh hint (server only)
    Sync,
    /// Content changed upstream (server only)
    ChangeNotify,
}

impl Path {
    /// Create a `Path` from its wire name
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "connect" => Some(Self::Connect),
            "connect_hello" => Some(Self::ConnectHello),
            "join_room" => Some(Self::JoinRoom),
            "room_status" => Some(Self::RoomStatus),
            "leave_room" => Some(Self::LeaveRoom),
            "connect_success" => Some(Self::ConnectSuccess),
            "connect_hello_ack" => Some(Self::ConnectHelloAck),
            "join_room_ack" => Some(Self::JoinRoomAck),
            "room_members" => Some(Self::RoomMembers),
            "sync" => Some(Self::Sync),
            "change_notify" => Some(Self::ChangeNotify),
            _ => None,
        }
    }

    /// Get the wire name of this path
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ConnectHello => "connect_hello",
            Self::JoinRoom => "join_room",
            Self::RoomStatus => "room_status",
            Self::LeaveRoom => "leave_room",
            Self::ConnectSuccess => "connect_success",
            Self::ConnectHelloAck => "connect_hello_ack",
            Self::JoinRoomAck => "join_room_ack",
            Self::RoomMembers => "room_members",
            Self::Sync => "sync",
            Self::ChangeNotify => "change_notify",
        }
    }

    /// Check if this path can be sent by the client
    #[must_use]
    pub const fn is_client_path(self) -> bool {
        matches!(
            self,
            Self::Connect
                | Self::ConnectHello
                | Self::JoinRoom
                | Self::RoomStatus
                | Self::LeaveRoom
        )
    }

    /// Check if this path can be sent by the server
    #[must_use]
    pub const fn is_server_path(self) -> bool {
        matches!(
            self,
            Self::ConnectSuccess
                | Self::ConnectHelloAck
                | Self::JoinRoomAck
                | Self::RoomMembers
                | Self::Sync
                | Self::ChangeNotify
        )
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid path: {value}")))
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope action field
///
/// Everything this client exchanges uses `message`; the other values exist
/// on the wire and must stay decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Message,
    Notification,
    Version,
}

//! Inbound message decoding
//!
//! Turns one received text frame into a typed [`InboundMessage`], dispatching
//! on the envelope's `path` field.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::paths::Path;
use crate::payloads::{ChangeNotifyEntry, HelloAckPayload, RoomMembersEntry, SessionParams};

/// A decoded server-to-client message
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// Session established; the first element carries the live parameters
    ConnectSuccess(Vec<SessionParams>),
    /// Keep-alive acknowledged
    ConnectHelloAck(HelloAckPayload),
    /// Room join acknowledged
    JoinRoomAck,
    /// Room roster snapshot/update
    RoomMembers(Vec<RoomMembersEntry>),
    /// Cache refresh hint; payload is opaque and ignored
    Sync,
    /// Content changed upstream
    ChangeNotify(Vec<ChangeNotifyEntry>),
}

impl InboundMessage {
    /// The path this message arrived under
    #[must_use]
    pub fn path(&self) -> Path {
        match self {
            Self::ConnectSuccess(_) => Path::ConnectSuccess,
            Self::ConnectHelloAck(_) => Path::ConnectHelloAck,
            Self::JoinRoomAck => Path::JoinRoomAck,
            Self::RoomMembers(_) => Path::RoomMembers,
            Self::Sync => Path::Sync,
            Self::ChangeNotify(_) => Path::ChangeNotify,
        }
    }
}

/// The envelope fields decode needs; everything else is ignored
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decode one received text frame
///
/// # Errors
/// Returns an error if the frame is not valid JSON, carries no `path`,
/// carries an unknown or client-only path, or its payload does not match
/// the shape registered for that path. Unknown extra fields are ignored.
pub fn decode(text: &str) -> Result<InboundMessage, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;

    let Some(raw_path) = raw.path else {
        return Err(DecodeError::MissingPath);
    };
    let Some(path) = Path::from_str(&raw_path) else {
        return Err(DecodeError::UnknownPath(raw_path));
    };

    let message = match path {
        Path::ConnectSuccess => InboundMessage::ConnectSuccess(parse_data(path, raw.data)?),
        Path::ConnectHelloAck => InboundMessage::ConnectHelloAck(parse_data(path, raw.data)?),
        Path::JoinRoomAck => InboundMessage::JoinRoomAck,
        Path::RoomMembers => InboundMessage::RoomMembers(parse_data(path, raw.data)?),
        Path::Sync => InboundMessage::Sync,
        Path::ChangeNotify => InboundMessage::ChangeNotify(parse_data(path, raw.data)?),
        Path::Connect
        | Path::ConnectHello
        | Path::JoinRoom
        | Path::RoomStatus
        | Path::LeaveRoom => return Err(DecodeError::UnexpectedPath(path)),
    };

    Ok(message)
}

fn parse_data<T: DeserializeOwned>(path: Path, data: Option<Value>) -> Result<T, DecodeError> {
    serde_json::from_value(data.unwrap_or(Value::Null))
        .map_err(|source| DecodeError::Payload { path, source })
}

//! # trickle-protocol
//!
//! Wire protocol for the push gateway: message paths, envelopes, and typed
//! payloads, carried as JSON over WebSocket text frames.
//!
//! Every frame in either direction is an envelope whose `path` field names
//! the message type. Client frames are built with [`Envelope`] constructors;
//! server frames are parsed with [`decode`] into an [`InboundMessage`].

mod envelope;
mod error;
mod inbound;
mod paths;
mod payloads;

pub use envelope::Envelope;
pub use error::DecodeError;
pub use inbound::{decode, InboundMessage};
pub use paths::{Action, Path};
pub use payloads::{
    is_workspace_trickle_key, workspace_room_id, ChangeCode, ChangeNotifyEntry, ChangeTrigger,
    HelloAckPayload, HelloPayload, LatestChangeEvent, PresenceStatus, RoomMembersEntry,
    RoomMembersUpdate, RoomStatusPayload, SessionParams, ROOM_ID_PREFIX,
};

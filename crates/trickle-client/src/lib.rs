//! # trickle-client
//!
//! Persistent WebSocket client for the push gateway.
//!
//! ## Features
//!
//! - **Session Handshake**: Opens the socket with a bearer token and trades
//!   `connect` / `connect_success` frames for server-dictated timings
//! - **Keep-Alive**: Repeating hello frames plus a dead-countdown that is the
//!   sole trigger for automatic reconnection
//! - **Room Membership**: Workspace room join/leave with presence refresh,
//!   restored automatically after every reconnect
//! - **Change Signals**: A single broadcast signal whenever the joined
//!   workspace's content changes
//!
//! ## Example
//!
//! ```ignore
//! use trickle_client::{ClientConfig, PushClient};
//!
//! let client = PushClient::new(ClientConfig::new("wss://push.example.com/ws")).await?;
//! client.initialize(token, user_id).await?;
//! client.join_room(workspace_id, member_id).await?;
//!
//! let mut changes = client.data_changed();
//! while changes.recv().await.is_ok() {
//!     println!("workspace content changed");
//! }
//! ```

pub mod client;
mod controller;
pub mod error;
pub mod session;
pub mod timers;
pub mod transport;

// Re-export client types
pub use client::{ClientConfig, ClientState, PushClient, ReconnectPolicy};

// Re-export error types
pub use error::{ClientError, TransportError};

// Re-export session types
pub use session::{ConnectSession, RoomMembership, DEFAULT_ROOM_HELLO_INTERVAL};

// Re-export timer types
pub use timers::{SessionTimers, TimerEvent, TimerRole};

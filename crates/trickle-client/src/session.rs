//! Connection session and room membership state.

use std::time::Duration;

use trickle_protocol::{workspace_room_id, SessionParams};

/// Fallback room presence refresh period when the session does not dictate one
pub const DEFAULT_ROOM_HELLO_INTERVAL: Duration = Duration::from_secs(30);

/// One established handshake cycle with the gateway.
///
/// Built from the first element of a `connect_success` payload and replaced
/// wholesale by the next one. All timings below are server-dictated.
#[derive(Debug, Clone)]
pub struct ConnectSession {
    params: SessionParams,
}

impl ConnectSession {
    #[must_use]
    pub fn new(params: SessionParams) -> Self {
        Self { params }
    }

    /// Server-assigned connection identifier
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.params.connection_id
    }

    /// Period of the repeating keep-alive hello
    #[must_use]
    pub fn hello_interval(&self) -> Duration {
        self.params.hello_interval()
    }

    /// Deadline after which an unacknowledged session is presumed dead
    #[must_use]
    pub fn dead_interval(&self) -> Duration {
        self.params.dead_interval()
    }

    /// Server-preferred pause before a reconnect attempt, when dictated
    #[must_use]
    pub fn retry_interval(&self) -> Option<Duration> {
        (self.params.retry_connection_interval > 0)
            .then(|| self.params.retry_connection_interval())
    }

    /// Period of the room presence refresh.
    ///
    /// A zero value from the server would spin the refresh loop, so it falls
    /// back to [`DEFAULT_ROOM_HELLO_INTERVAL`].
    #[must_use]
    pub fn room_hello_interval(&self) -> Duration {
        if self.params.room_status_hello_interval > 0 {
            self.params.room_status_hello_interval()
        } else {
            DEFAULT_ROOM_HELLO_INTERVAL
        }
    }

    /// Raw session parameters as the server sent them
    #[must_use]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }
}

/// Presence in one workspace room.
///
/// Survives reconnection; cleared only by an explicit leave or close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room_id: String,
    pub member_id: String,
}

impl RoomMembership {
    /// Membership in the room that carries a workspace's change traffic
    #[must_use]
    pub fn for_workspace(workspace_id: &str, member_id: impl Into<String>) -> Self {
        Self {
            room_id: workspace_room_id(workspace_id),
            member_id: member_id.into(),
        }
    }
}

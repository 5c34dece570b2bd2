//! Public client handle.
//!
//! [`PushClient`] is a cheap, cloneable handle over the controller task.
//! Every method is a message into the controller's mailbox; observation
//! happens through a `watch` channel for connection state and a `broadcast`
//! channel for data-changed signals.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use crate::controller::{Command, Controller};
use crate::error::{ClientError, ClientResult};
use crate::transport;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;
const TIMER_BUFFER: usize = 16;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_SIGNAL_BUFFER: usize = 16;

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    /// No connection and no attempt in flight
    #[default]
    Disconnected,
    /// Dialing the gateway or waiting for `connect_success`
    Connecting,
    /// Session established, waiting for the first hello acknowledgement
    AwaitingHello,
    /// Hello acknowledged; the dead-countdown is armed
    Live,
    /// The dead-countdown expired; the session is being rebuilt
    Dead,
    /// An explicit close is in progress
    Closing,
}

impl ClientState {
    /// Human-readable state name for logging
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting-hello",
            Self::Live => "live",
            Self::Dead => "dead",
            Self::Closing => "closing",
        }
    }

    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the client retries after a failed connection cycle
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Attempts after a failure before giving up; `None` retries without bound
    pub max_attempts: Option<u32>,
    /// Pause between attempts when the server has not dictated one
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway endpoint, `ws://` or `wss://`
    pub endpoint: String,
    /// Upper bound on one dial attempt
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Capacity of the data-changed broadcast channel; must be at least 1
    pub signal_buffer: usize,
}

impl ClientConfig {
    /// Configuration with default timings for the given endpoint
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            signal_buffer: DEFAULT_SIGNAL_BUFFER,
        }
    }
}

/// Handle to a running push client.
///
/// Cloning is cheap; all clones drive the same controller task. The
/// controller shuts itself down once the last handle is dropped.
#[derive(Clone)]
pub struct PushClient {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ClientState>,
    data_changed: broadcast::Sender<()>,
}

impl PushClient {
    /// Spawn the controller task for `config`.
    ///
    /// The client starts out [`ClientState::Disconnected`]; nothing touches
    /// the network until [`PushClient::initialize`] is called.
    pub async fn new(config: ClientConfig) -> ClientResult<Self> {
        let endpoint = transport::parse_endpoint(&config.endpoint)?;

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (timer_tx, timer_rx) = mpsc::channel(TIMER_BUFFER);
        let (state_tx, state_rx) = watch::channel(ClientState::Disconnected);
        let (data_changed_tx, _) = broadcast::channel(config.signal_buffer);

        let controller = Controller::new(
            config,
            endpoint,
            state_tx,
            data_changed_tx.clone(),
            events_tx,
            timer_tx,
        );
        tokio::spawn(controller.run(commands_rx, events_rx, timer_rx));

        Ok(Self {
            commands: commands_tx,
            state_rx,
            data_changed: data_changed_tx,
        })
    }

    /// Store credentials and (re)build the connection from scratch.
    ///
    /// Any existing connection is torn down first. Room membership survives
    /// and is restored once the new session is established.
    pub async fn initialize(
        &self,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> ClientResult<()> {
        self.send_command(Command::Initialize {
            token: token.into(),
            user_id: user_id.into(),
        })
        .await
    }

    /// Replace the stored credentials without touching the connection.
    ///
    /// The new token rides on every subsequent frame and connect attempt.
    pub async fn update_credentials(
        &self,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> ClientResult<()> {
        self.send_command(Command::UpdateCredentials {
            token: token.into(),
            user_id: user_id.into(),
        })
        .await
    }

    /// Join a workspace's room and keep presence refreshed there.
    pub async fn join_room(
        &self,
        workspace_id: impl Into<String>,
        member_id: impl Into<String>,
    ) -> ClientResult<()> {
        self.send_command(Command::JoinRoom {
            workspace_id: workspace_id.into(),
            member_id: member_id.into(),
        })
        .await
    }

    /// Leave a workspace's room.
    pub async fn leave_room(
        &self,
        workspace_id: impl Into<String>,
        member_id: impl Into<String>,
    ) -> ClientResult<()> {
        self.send_command(Command::LeaveRoom {
            workspace_id: workspace_id.into(),
            member_id: member_id.into(),
        })
        .await
    }

    /// Leave any joined room, stop every timer, and close the connection.
    ///
    /// Idempotent; a second close produces no further traffic. The client
    /// can be re-initialized afterwards.
    pub async fn close(&self) -> ClientResult<()> {
        self.send_command(Command::Close).await
    }

    /// Subscribe to the data-changed signal.
    ///
    /// One `()` arrives for every `change_notify` frame that carries at
    /// least one workspace trickle code.
    #[must_use]
    pub fn data_changed(&self) -> broadcast::Receiver<()> {
        self.data_changed.subscribe()
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ClientState {
        *self.state_rx.borrow()
    }

    /// Watch connection state transitions
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    async fn send_command(&self, command: Command) -> ClientResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Closed)
    }
}

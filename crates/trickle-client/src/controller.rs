//! Connection controller.
//!
//! A single actor task owns every piece of connection state: the transport,
//! the established session, room membership, and the timer sets. Commands
//! from the [`crate::client::PushClient`] handle and events from spawned
//! connect, reader, and timer tasks all funnel into one mailbox, so no state
//! is ever touched from two tasks at once.
//!
//! Reconnection of an established session has exactly one trigger: the
//! dead-countdown timer expiring without a hello acknowledgement. Transport
//! errors alone never tear down a live session; they only silence it until
//! that countdown runs out. Failures before a session is established (dial
//! errors, timeouts, a dropped socket mid-handshake) retry under the
//! reconnect policy directly, since no timer exists yet to drive recovery.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use url::Url;

use trickle_common::Credentials;
use trickle_protocol::{
    decode, ChangeNotifyEntry, Envelope, HelloAckPayload, InboundMessage, SessionParams,
};

use crate::client::{ClientConfig, ClientState};
use crate::error::TransportError;
use crate::session::{ConnectSession, RoomMembership, DEFAULT_ROOM_HELLO_INTERVAL};
use crate::timers::{SessionTimers, TimerEvent, TimerRole};
use crate::transport::{gateway_url, Transport, TransportReader};

/// Requests from the public client handle
#[derive(Debug)]
pub enum Command {
    Initialize { token: String, user_id: String },
    UpdateCredentials { token: String, user_id: String },
    JoinRoom { workspace_id: String, member_id: String },
    LeaveRoom { workspace_id: String, member_id: String },
    Close,
}

/// Events posted by spawned connect and reader tasks
pub enum Event {
    /// A connect task produced an open socket
    Opened {
        epoch: u64,
        transport: Transport,
        reader: TransportReader,
    },
    /// A connect task gave up on this attempt
    OpenFailed { epoch: u64, error: TransportError },
    /// One text frame from the reader task
    Frame { epoch: u64, text: String },
    /// The reader stream ended, by error or server close
    StreamEnded {
        epoch: u64,
        error: Option<TransportError>,
    },
}

pub struct Controller {
    config: ClientConfig,
    endpoint: Url,
    credentials: Option<Credentials>,
    session: Option<ConnectSession>,
    membership: Option<RoomMembership>,
    /// Timer sets keyed by connection id
    timers: HashMap<String, SessionTimers>,
    transport: Option<Transport>,
    /// Bumped on every teardown; events stamped with an older epoch are stale
    epoch: u64,
    next_set_id: u64,
    /// Failed cycles since the last successful handshake
    attempts: u32,
    state_tx: watch::Sender<ClientState>,
    data_changed_tx: broadcast::Sender<()>,
    events_tx: mpsc::Sender<Event>,
    timer_tx: mpsc::Sender<TimerEvent>,
}

impl Controller {
    pub fn new(
        config: ClientConfig,
        endpoint: Url,
        state_tx: watch::Sender<ClientState>,
        data_changed_tx: broadcast::Sender<()>,
        events_tx: mpsc::Sender<Event>,
        timer_tx: mpsc::Sender<TimerEvent>,
    ) -> Self {
        Self {
            config,
            endpoint,
            credentials: None,
            session: None,
            membership: None,
            timers: HashMap::new(),
            transport: None,
            epoch: 0,
            next_set_id: 0,
            attempts: 0,
            state_tx,
            data_changed_tx,
            events_tx,
            timer_tx,
        }
    }

    /// Run the mailbox loop until every client handle is gone.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::Receiver<Event>,
        mut timer_events: mpsc::Receiver<TimerEvent>,
    ) {
        tracing::debug!("Connection controller started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        tracing::debug!("All client handles dropped; closing");
                        self.close().await;
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event).await,
                Some(event) = timer_events.recv() => self.on_timer(event).await,
            }
        }
        tracing::debug!("Connection controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Initialize { token, user_id } => self.initialize(token, user_id).await,
            Command::UpdateCredentials { token, user_id } => {
                tracing::debug!(user_id = %user_id, "Credentials updated");
                self.credentials = Some(Credentials::new(token, user_id));
            }
            Command::JoinRoom {
                workspace_id,
                member_id,
            } => self.join_room(&workspace_id, member_id).await,
            Command::LeaveRoom {
                workspace_id,
                member_id,
            } => self.leave_room(&workspace_id, &member_id).await,
            Command::Close => self.close().await,
        }
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Opened {
                epoch,
                transport,
                reader,
            } => self.on_opened(epoch, transport, reader).await,
            Event::OpenFailed { epoch, error } => self.on_open_failed(epoch, &error).await,
            Event::Frame { epoch, text } => self.on_frame(epoch, &text).await,
            Event::StreamEnded { epoch, error } => self.on_stream_ended(epoch, error).await,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    async fn initialize(&mut self, token: String, user_id: String) {
        tracing::info!(user_id = %user_id, "Initializing gateway connection");
        self.credentials = Some(Credentials::new(token, user_id));
        // Room membership deliberately survives; it is restored once the
        // new session is established
        self.teardown_connection().await;
        self.attempts = 0;
        self.set_state(ClientState::Connecting);
        self.spawn_connect(None);
    }

    async fn join_room(&mut self, workspace_id: &str, member_id: String) {
        let membership = RoomMembership::for_workspace(workspace_id, member_id);
        tracing::info!(
            room_id = %membership.room_id,
            member_id = %membership.member_id,
            "Joining room"
        );
        let envelope = self.authorized(Envelope::join_room(
            membership.room_id.clone(),
            membership.member_id.clone(),
        ));
        self.membership = Some(membership);
        self.send_envelope(envelope).await;
    }

    async fn leave_room(&mut self, workspace_id: &str, member_id: &str) {
        let room_id = trickle_protocol::workspace_room_id(workspace_id);
        tracing::info!(room_id = %room_id, member_id = %member_id, "Leaving room");
        let envelope = self.authorized(Envelope::leave_room(room_id.clone(), member_id));
        self.send_envelope(envelope).await;

        let matches = self
            .membership
            .as_ref()
            .is_some_and(|m| m.room_id == room_id && m.member_id == member_id);
        if matches {
            self.membership = None;
            if let Some(set) = self.current_timers_mut() {
                set.cancel(TimerRole::RoomHello);
                set.cancel(TimerRole::RoomDead);
            }
        } else if self.membership.is_some() {
            tracing::debug!(room_id = %room_id, "Left room is not the active membership");
        }
    }

    async fn close(&mut self) {
        if self.current_state() == ClientState::Disconnected
            && self.transport.is_none()
            && self.session.is_none()
            && self.membership.is_none()
        {
            tracing::debug!("Close on an already-disconnected client");
            return;
        }

        self.set_state(ClientState::Closing);
        if let Some(membership) = self.membership.take() {
            tracing::info!(room_id = %membership.room_id, "Leaving room before close");
            let envelope = self.authorized(Envelope::leave_room(
                membership.room_id,
                membership.member_id,
            ));
            self.send_envelope(envelope).await;
        }
        self.teardown_connection().await;
        self.attempts = 0;
        self.set_state(ClientState::Disconnected);
        tracing::info!("Client closed");
    }

    // ------------------------------------------------------------------
    // Connect lifecycle
    // ------------------------------------------------------------------

    fn spawn_connect(&mut self, delay: Option<Duration>) {
        let Some(credentials) = self.credentials.clone() else {
            tracing::warn!("Connect requested before credentials were provided");
            self.set_state(ClientState::Disconnected);
            return;
        };
        let url = gateway_url(&self.endpoint, &credentials.token);
        let epoch = self.epoch;
        let timeout = self.config.connect_timeout;
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match Transport::connect(&url, timeout).await {
                Ok((transport, reader)) => {
                    let _ = events
                        .send(Event::Opened {
                            epoch,
                            transport,
                            reader,
                        })
                        .await;
                }
                Err(error) => {
                    let _ = events.send(Event::OpenFailed { epoch, error }).await;
                }
            }
        });
    }

    async fn on_opened(&mut self, epoch: u64, transport: Transport, reader: TransportReader) {
        if epoch != self.epoch {
            tracing::debug!("Discarding socket from a superseded connect attempt");
            tokio::spawn(transport.close());
            return;
        }
        tracing::info!("Gateway connection open");
        self.transport = Some(transport);
        self.spawn_reader(epoch, reader);

        let envelope = self.authorized(Envelope::connect());
        if !self.send_envelope(envelope).await {
            tracing::warn!("Handshake frame could not be sent; counting attempt as failed");
            self.teardown_connection().await;
            self.set_state(ClientState::Disconnected);
            self.after_failure(None).await;
        }
    }

    async fn on_open_failed(&mut self, epoch: u64, error: &TransportError) {
        if epoch != self.epoch {
            return;
        }
        tracing::warn!(error = %error, "Connect attempt failed");
        self.after_failure(None).await;
    }

    fn spawn_reader(&self, epoch: u64, mut reader: TransportReader) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            loop {
                match reader.next_text().await {
                    Some(Ok(text)) => {
                        if events.send(Event::Frame { epoch, text }).await.is_err() {
                            // Controller is gone
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        let _ = events
                            .send(Event::StreamEnded {
                                epoch,
                                error: Some(error),
                            })
                            .await;
                        return;
                    }
                    None => {
                        let _ = events.send(Event::StreamEnded { epoch, error: None }).await;
                        return;
                    }
                }
            }
        });
    }

    async fn on_stream_ended(&mut self, epoch: u64, error: Option<TransportError>) {
        if epoch != self.epoch {
            return;
        }
        match error {
            Some(e) => tracing::warn!(error = %e, "Receive stream ended"),
            None => tracing::info!("Server closed the connection"),
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }

        match self.current_state() {
            // A live session is only declared dead by its countdown; the
            // hello timer keeps running and its sends become no-ops
            ClientState::Live => {}
            ClientState::Connecting | ClientState::AwaitingHello => {
                let retry_delay = self.session.as_ref().and_then(ConnectSession::retry_interval);
                self.teardown_connection().await;
                self.set_state(ClientState::Disconnected);
                self.after_failure(retry_delay).await;
            }
            ClientState::Disconnected | ClientState::Dead | ClientState::Closing => {}
        }
    }

    /// Count a failed cycle and either schedule the next attempt or give up.
    async fn after_failure(&mut self, delay_hint: Option<Duration>) {
        self.attempts += 1;
        if let Some(max) = self.config.reconnect.max_attempts {
            if self.attempts > max {
                tracing::error!(
                    attempts = self.attempts - 1,
                    "Reconnect attempts exhausted; staying disconnected"
                );
                self.attempts = 0;
                self.set_state(ClientState::Disconnected);
                return;
            }
        }
        let delay = delay_hint.unwrap_or(self.config.reconnect.delay);
        tracing::info!(attempt = self.attempts, delay = ?delay, "Scheduling connect attempt");
        self.set_state(ClientState::Connecting);
        self.spawn_connect(Some(delay));
    }

    /// Drop the transport, cancel every timer, and forget the session.
    ///
    /// Bumping the epoch makes any in-flight event from the old connection
    /// identifiable as stale.
    async fn teardown_connection(&mut self) {
        self.clear_all_timers();
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
        self.session = None;
        self.epoch += 1;
    }

    fn clear_all_timers(&mut self) {
        for (_, mut set) in self.timers.drain() {
            set.cancel_all();
        }
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    async fn on_frame(&mut self, epoch: u64, text: &str) {
        if epoch != self.epoch {
            tracing::trace!("Discarding frame from a superseded connection");
            return;
        }
        let message = match decode(text) {
            Ok(message) => message,
            Err(e) => {
                // Malformed traffic never tears the connection down
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };
        tracing::trace!(path = %message.path(), "Received message");
        match message {
            InboundMessage::ConnectSuccess(params) => self.on_connect_success(params).await,
            InboundMessage::ConnectHelloAck(ack) => self.on_hello_ack(&ack),
            InboundMessage::JoinRoomAck => self.on_join_room_ack(),
            InboundMessage::RoomMembers(entries) => {
                tracing::trace!(entries = entries.len(), "Room roster update");
            }
            InboundMessage::Sync => tracing::debug!("Sync hint received"),
            InboundMessage::ChangeNotify(entries) => self.on_change_notify(&entries),
        }
    }

    async fn on_connect_success(&mut self, params: Vec<SessionParams>) {
        let Some(params) = params.into_iter().next() else {
            tracing::warn!("connect_success carried no session parameters");
            return;
        };

        // The previous session's timers die with it
        self.clear_all_timers();

        let session = ConnectSession::new(params);
        let connection_id = session.connection_id().to_string();
        tracing::info!(
            connection_id = %connection_id,
            hello_interval_secs = session.params().hello_interval,
            dead_interval_secs = session.params().dead_interval,
            "Session established"
        );
        self.attempts = 0;

        self.next_set_id += 1;
        let mut set = SessionTimers::new(self.next_set_id, self.timer_tx.clone());
        if session.params().hello_interval > 0 {
            set.schedule(TimerRole::HelloInterval, session.hello_interval(), true);
        } else {
            tracing::warn!(connection_id = %connection_id, "Zero hello interval; keep-alive disabled");
        }
        if session.params().dead_interval == 0 {
            tracing::warn!(connection_id = %connection_id, "Zero dead interval; staleness detection disabled");
        }
        self.timers.insert(connection_id, set);
        self.session = Some(session);
        self.set_state(ClientState::AwaitingHello);

        if let Some(membership) = self.membership.clone() {
            tracing::info!(room_id = %membership.room_id, "Restoring room membership");
            let envelope =
                self.authorized(Envelope::join_room(membership.room_id, membership.member_id));
            self.send_envelope(envelope).await;
        }
    }

    fn on_hello_ack(&mut self, ack: &HelloAckPayload) {
        let Some(session) = &self.session else {
            tracing::debug!("Hello acknowledgement with no live session");
            return;
        };
        if ack.conn_id != session.connection_id() {
            tracing::debug!(conn_id = %ack.conn_id, "Hello acknowledgement for a different connection");
            return;
        }
        let dead_interval = session.dead_interval();
        let armed = session.params().dead_interval > 0;

        let Some(set) = self.current_timers_mut() else {
            tracing::debug!("Hello acknowledgement with no timer set");
            return;
        };
        if armed {
            set.schedule(TimerRole::DeadCountdown, dead_interval, false);
        }
        self.set_state(ClientState::Live);
    }

    fn on_join_room_ack(&mut self) {
        if self.membership.is_none() {
            tracing::debug!("join_room_ack with no active membership");
            return;
        }
        let interval = self
            .session
            .as_ref()
            .map_or(DEFAULT_ROOM_HELLO_INTERVAL, ConnectSession::room_hello_interval);
        let Some(set) = self.current_timers_mut() else {
            tracing::debug!("join_room_ack with no timer set");
            return;
        };
        set.schedule(TimerRole::RoomHello, interval, true);
        tracing::debug!(interval = ?interval, "Room presence refresh armed");
    }

    fn on_change_notify(&mut self, entries: &[ChangeNotifyEntry]) {
        if entries.iter().any(ChangeNotifyEntry::has_trickle_change) {
            tracing::debug!(
                entries = entries.len(),
                "Workspace content changed; notifying subscribers"
            );
            // Ignore send errors - no receivers
            let _ = self.data_changed_tx.send(());
        } else {
            tracing::trace!(
                entries = entries.len(),
                "change_notify without workspace trickle codes"
            );
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    async fn on_timer(&mut self, event: TimerEvent) {
        let accepted = self
            .session
            .as_ref()
            .map(|session| session.connection_id().to_string())
            .and_then(|id| self.timers.get(&id))
            .is_some_and(|set| set.accepts(&event));
        if !accepted {
            tracing::trace!(role = %event.role, "Discarding stale timer firing");
            return;
        }
        match event.role {
            TimerRole::HelloInterval => self.on_hello_due().await,
            TimerRole::DeadCountdown => self.on_dead_countdown().await,
            TimerRole::RoomHello => self.on_room_hello_due().await,
            TimerRole::Ping | TimerRole::RoomDead => {
                tracing::debug!(role = %event.role, "Timer role has no handler");
            }
        }
    }

    async fn on_hello_due(&mut self) {
        let Some(credentials) = self.credentials.clone() else {
            tracing::warn!("Hello due with no credentials");
            return;
        };
        tracing::trace!(user_id = %credentials.user_id, "Sending keep-alive hello");
        let envelope =
            Envelope::connect_hello(credentials.user_id).with_authorization(&credentials.token);
        self.send_envelope(envelope).await;
    }

    async fn on_room_hello_due(&mut self) {
        let Some(membership) = self.membership.clone() else {
            tracing::debug!("Room presence refresh due with no active membership");
            return;
        };
        tracing::trace!(room_id = %membership.room_id, "Refreshing room presence");
        let envelope = self.authorized(Envelope::room_status(
            membership.room_id,
            membership.member_id,
        ));
        self.send_envelope(envelope).await;
    }

    async fn on_dead_countdown(&mut self) {
        tracing::warn!("No hello acknowledgement within the dead interval; rebuilding connection");
        let retry_delay = self.session.as_ref().and_then(ConnectSession::retry_interval);
        self.set_state(ClientState::Dead);
        self.teardown_connection().await;
        self.set_state(ClientState::Disconnected);
        self.after_failure(retry_delay).await;
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Send an envelope over the open transport, if any.
    ///
    /// Returns whether the frame went out. A missing transport is a quiet
    /// no-op so timer-driven sends can keep firing while disconnected.
    async fn send_envelope(&mut self, envelope: Envelope) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            tracing::debug!(path = %envelope.path, "No open connection; dropping outgoing frame");
            return false;
        };
        match envelope.to_json() {
            Ok(json) => {
                if let Err(e) = transport.send(json).await {
                    tracing::warn!(path = %envelope.path, error = %e, "Failed to send frame");
                    return false;
                }
                true
            }
            Err(e) => {
                tracing::warn!(path = %envelope.path, error = %e, "Failed to encode frame");
                false
            }
        }
    }

    fn authorized(&self, envelope: Envelope) -> Envelope {
        match &self.credentials {
            Some(credentials) => envelope.with_authorization(&credentials.token),
            None => envelope,
        }
    }

    fn current_timers_mut(&mut self) -> Option<&mut SessionTimers> {
        let connection_id = self.session.as_ref()?.connection_id().to_string();
        self.timers.get_mut(&connection_id)
    }

    fn current_state(&self) -> ClientState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ClientState) {
        if self.current_state() != state {
            tracing::debug!(state = %state, "Connection state changed");
            let _ = self.state_tx.send(state);
        }
    }
}

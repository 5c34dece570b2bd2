//! Named per-session timers.
//!
//! Every timer a connection session arms lives in one [`SessionTimers`] set,
//! so teardown can cancel the whole session at once. Firings are not handled
//! inside the timer task; they are posted as [`TimerEvent`]s into the
//! controller mailbox and validated against the set's current arming there,
//! which keeps a cancelled timer from ever reaching its handler even when
//! the firing was already in flight.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Timer roles a connection session can arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerRole {
    /// Repeating keep-alive hello send
    HelloInterval,
    /// One-shot staleness deadline, re-armed by every hello acknowledgement
    DeadCountdown,
    /// Reserved low-level ping slot
    Ping,
    /// Repeating room presence refresh
    RoomHello,
    /// One-shot room staleness deadline
    RoomDead,
}

impl TimerRole {
    /// Human-readable role name for logging
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HelloInterval => "hello-interval",
            Self::DeadCountdown => "dead-countdown",
            Self::Ping => "ping",
            Self::RoomHello => "room-hello",
            Self::RoomDead => "room-dead",
        }
    }
}

impl std::fmt::Display for TimerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A timer firing, posted into the controller mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    /// Identifier of the set that armed the timer
    pub set_id: u64,
    /// Role the timer was armed under
    pub role: TimerRole,
    /// Arming generation within the set; stale generations are discarded
    pub seq: u64,
}

struct ArmedTimer {
    seq: u64,
    cancel: CancellationToken,
}

/// All timers belonging to one connection session.
///
/// At most one timer is armed per role; arming a role again replaces the
/// previous timer. Dropping the set cancels every timer in it.
pub struct SessionTimers {
    id: u64,
    cancel: CancellationToken,
    armed: HashMap<TimerRole, ArmedTimer>,
    next_seq: u64,
    events: mpsc::Sender<TimerEvent>,
}

impl SessionTimers {
    /// Create an empty set.
    ///
    /// `id` must be unique among all sets that share the `events` channel,
    /// otherwise a firing from a discarded set could pass validation.
    #[must_use]
    pub fn new(id: u64, events: mpsc::Sender<TimerEvent>) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
            armed: HashMap::new(),
            next_seq: 0,
            events,
        }
    }

    /// Identifier this set stamps on its firings
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Arm a timer, replacing any existing timer for the role.
    ///
    /// Repeating timers re-arm themselves after each firing; one-shot timers
    /// fire once and disarm. Returns the arming generation.
    pub fn schedule(&mut self, role: TimerRole, interval: Duration, repeating: bool) -> u64 {
        self.disarm(role);
        self.next_seq += 1;
        let seq = self.next_seq;

        let event = TimerEvent { set_id: self.id, role, seq };
        let events = self.events.clone();
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_timer(event, interval, repeating, events, task_cancel).await;
        });

        self.armed.insert(role, ArmedTimer { seq, cancel });
        tracing::trace!(role = %role, seq, interval = ?interval, "Timer armed");
        seq
    }

    /// Latest arming generation for a role, if armed
    #[must_use]
    pub fn current_seq(&self, role: TimerRole) -> Option<u64> {
        self.armed.get(&role).map(|timer| timer.seq)
    }

    /// Check whether a firing belongs to this set's live arming for its role.
    #[must_use]
    pub fn accepts(&self, event: &TimerEvent) -> bool {
        event.set_id == self.id && self.current_seq(event.role) == Some(event.seq)
    }

    /// Cancel one role's timer if armed.
    pub fn cancel(&mut self, role: TimerRole) {
        if self.armed.contains_key(&role) {
            tracing::trace!(role = %role, "Timer cancelled");
        }
        self.disarm(role);
    }

    /// Cancel every timer in the set.
    pub fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.armed.clear();
    }

    /// Number of roles currently armed
    #[must_use]
    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    fn disarm(&mut self, role: TimerRole) {
        if let Some(timer) = self.armed.remove(&role) {
            timer.cancel.cancel();
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_timer(
    event: TimerEvent,
    interval: Duration,
    repeating: bool,
    events: mpsc::Sender<TimerEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {
                if events.send(event).await.is_err() {
                    // Controller is gone
                    return;
                }
                if !repeating {
                    return;
                }
            }
            () = cancel.cancelled() => {
                return;
            }
        }
    }
}

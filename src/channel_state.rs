/// file: src/channel_state.rs
/// description: Connection state, reconnect timer and session bookkeeping for the event channel
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Single-shot timer; at most one pending callback at any time.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    pending: Option<JoinHandle<()>>,
}

impl ReconnectTimer {
    /// Disarms any pending timer, then schedules `on_fire` after `delay`.
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.disarm();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        }));
    }

    /// Returns true if a timer was pending.
    pub fn disarm(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Forgets the handle without aborting; used by the firing task itself.
    pub(crate) fn release(&mut self) {
        self.pending = None;
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[derive(Debug, Default)]
pub struct ChannelState {
    pub connection: ConnectionState,
    /// Bumped by every connect attempt and every teardown; sessions carry the value
    /// they were started with and go inert once it no longer matches.
    pub generation: u64,
    pub outbound: Option<mpsc::UnboundedSender<String>>,
    pub session: Option<JoinHandle<()>>,
    pub reconnect: ReconnectTimer,
    pub reconnect_attempts: u32,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.connection = ConnectionState::Connecting;
        self.generation
    }

    /// Records a successful open and returns an id for tagging the session's logs.
    pub fn mark_open(&mut self, outbound: mpsc::UnboundedSender<String>) -> String {
        let connection_id = uuid::Uuid::new_v4().to_string();
        self.connection = ConnectionState::Connected;
        self.outbound = Some(outbound);
        self.reconnect.disarm();
        self.reconnect_attempts = 0;
        connection_id
    }

    /// Records an unexpected close. The reconnect timer is armed by the caller.
    pub fn mark_lost(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.outbound = None;
        self.session = None;
        self.reconnect_attempts += 1;
    }

    /// Client-initiated teardown; returns the state the connection was in.
    pub fn teardown(&mut self) -> ConnectionState {
        self.generation += 1;
        self.reconnect.disarm();
        if let Some(session) = self.session.take() {
            session.abort();
        }
        self.outbound = None;
        std::mem::replace(&mut self.connection, ConnectionState::Disconnected)
    }
}

// file: src/channel.rs
// description: event channel client: one logical connection to the backend, envelope dispatch, fixed-delay reconnect

use crate::{
    callbacks::{CallbackRegistry, ChannelError, CloseReason},
    channel_state::{ChannelState, ConnectionState},
    config::ChannelConfig,
    monitoring::{
        ALERT_COUNTER, CONNECTED_GAUGE, MESSAGES_RECEIVED_COUNTER, MESSAGES_SENT_COUNTER,
        PROTOCOL_ERROR_COUNTER, RECONNECT_COUNTER,
    },
    transport::{Connector, Transport, TransportEvent, WsConnector},
    types::{DetectionConfig, EventEnvelope, OutboundMessage},
};
use serde::Serialize;
use std::{
    cell::Cell,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Client for the backend event channel.
///
/// Owns at most one live transport. Unexpected closes schedule a reconnect after a
/// fixed delay, indefinitely, until [`disconnect`](Self::disconnect) is called.
/// Lifecycle methods never fail: transport problems surface through the `on_error`
/// and `on_disconnect` callbacks and the logs.
///
/// Callbacks run one at a time, in arrival order. Once [`disconnect`](Self::disconnect)
/// returns, no callback from the closed session runs anymore.
///
/// `connect` spawns onto the current tokio runtime.
pub struct EventChannelClient<C: Connector = WsConnector> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    url: Url,
    reconnect_delay: Duration,
    connector: C,
    callbacks: RwLock<Arc<CallbackRegistry>>,
    state: Mutex<ChannelState>,
    // held while a session callback runs
    dispatch: Mutex<()>,
}

thread_local! {
    // set while this thread runs a session callback, so a callback may call
    // `disconnect` without waiting on itself
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

struct DispatchScope;

impl DispatchScope {
    fn enter() -> Self {
        DISPATCHING.with(|flag| flag.set(true));
        DispatchScope
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

impl<C: Connector> Clone for EventChannelClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl EventChannelClient<WsConnector> {
    pub fn new(config: &ChannelConfig) -> Self {
        Self::with_connector(config, WsConnector::default())
    }
}

impl<C: Connector> EventChannelClient<C> {
    pub fn with_connector(config: &ChannelConfig, connector: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: config.url.clone(),
                reconnect_delay: config.reconnect_delay,
                connector,
                callbacks: RwLock::new(Arc::new(CallbackRegistry::default())),
                state: Mutex::new(ChannelState::new()),
                dispatch: Mutex::new(()),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Replaces the whole registry; takes effect for every event handled afterwards.
    pub fn set_callbacks(&self, callbacks: CallbackRegistry) {
        let mut slot = self
            .inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(callbacks);
    }

    /// Opens the channel. No-op while an attempt is in flight or the channel is up.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Closes the channel and cancels any pending reconnect. Never reconnects afterwards
    /// unless `connect` is called again.
    pub fn disconnect(&self) {
        let previous = self.inner.lock_state().teardown();
        CONNECTED_GAUGE.set(0.0);
        info!(url = %self.inner.url, "Event channel closed by client");

        // wait out a callback already running on another thread
        let _dispatch = (!DISPATCHING.with(Cell::get)).then(|| self.inner.lock_dispatch());
        if previous == ConnectionState::Connected {
            self.inner
                .callbacks()
                .emit_disconnect(CloseReason::Requested);
        }
    }

    /// Fire-and-forget send. Dropped with a warning unless the channel is connected.
    pub fn send_message<T: Serialize + ?Sized>(&self, payload: &T) {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("Dropping outbound message that failed to serialize: {}", e);
                return;
            }
        };

        let state = self.inner.lock_state();
        match (state.connection, state.outbound.as_ref()) {
            (ConnectionState::Connected, Some(outbound)) => {
                if outbound.send(text).is_ok() {
                    MESSAGES_SENT_COUNTER.increment(1);
                } else {
                    warn!("Dropping outbound message, transport already closed");
                }
            }
            (connection, _) => {
                warn!(
                    state = ?connection,
                    "Cannot send message, event channel is not connected"
                );
            }
        }
    }

    pub fn update_config(&self, config: &DetectionConfig) {
        self.send_message(&OutboundMessage::Config(config.clone()));
    }

    pub fn change_camera(&self, source: &str) {
        self.send_message(&OutboundMessage::CameraSource(source.to_string()));
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.lock_state().connection
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.inner.lock_state().reconnect.is_armed()
    }

    /// Consecutive unexpected closes since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock_state().reconnect_attempts
    }
}

impl<C: Connector> Inner<C> {
    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> Arc<CallbackRegistry> {
        Arc::clone(
            &self
                .callbacks
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_state().is_current(generation)
    }

    /// Runs `emit` against the registered callbacks unless the session has been
    /// superseded. Returns false for a stale session.
    fn dispatch(&self, generation: u64, emit: impl FnOnce(&CallbackRegistry)) -> bool {
        let _dispatch = self.lock_dispatch();
        if !self.is_current(generation) {
            return false;
        }
        let callbacks = self.callbacks();
        let _scope = DispatchScope::enter();
        emit(&callbacks);
        true
    }

    fn connect(self: &Arc<Self>) {
        let mut state = self.lock_state();
        self.start_session(&mut state);
    }

    fn start_session(self: &Arc<Self>, state: &mut ChannelState) {
        if state.connection != ConnectionState::Disconnected {
            debug!(state = ?state.connection, "Connect ignored, event channel already active");
            return;
        }

        let generation = state.begin_attempt();
        info!(
            url = %self.url,
            attempt = state.reconnect_attempts,
            "Connecting to event channel"
        );
        let inner = Arc::clone(self);
        state.session = Some(tokio::spawn(inner.run_session(generation)));
    }

    async fn run_session(self: Arc<Self>, generation: u64) {
        let transport = match self.connector.connect(&self.url).await {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to connect to event channel: {}", e);
                self.dispatch(generation, |callbacks| {
                    callbacks.emit_error(ChannelError::transport(e.to_string()))
                });
                self.handle_close(generation, CloseReason::Failed(e.to_string()));
                return;
            }
        };

        let Transport {
            outbound,
            mut inbound,
        } = transport;
        let Some(connection_id) = self.mark_open(generation, outbound) else {
            debug!("Discarding transport opened after the channel was closed");
            return;
        };

        info!(url = %self.url, %connection_id, "Event channel connected");
        if !self.dispatch(generation, CallbackRegistry::emit_connect) {
            return;
        }

        let reason = loop {
            let live = match inbound.recv().await {
                Some(TransportEvent::Message(text)) => self.handle_text(generation, &text),
                Some(TransportEvent::Error(message)) => {
                    warn!(%connection_id, "Event channel transport error: {}", message);
                    self.dispatch(generation, |callbacks| {
                        callbacks.emit_error(ChannelError::transport(message))
                    })
                }
                Some(TransportEvent::Closed(reason)) => break reason,
                None => break CloseReason::Remote(None),
            };
            if !live {
                return;
            }
        };

        self.handle_close(generation, reason);
    }

    fn mark_open(
        &self,
        generation: u64,
        outbound: tokio::sync::mpsc::UnboundedSender<String>,
    ) -> Option<String> {
        let mut state = self.lock_state();
        if !state.is_current(generation) {
            return None;
        }
        let connection_id = state.mark_open(outbound);
        CONNECTED_GAUGE.set(1.0);
        Some(connection_id)
    }

    /// Decodes and dispatches one message. Returns false once the session is stale.
    fn handle_text(&self, generation: u64, text: &str) -> bool {
        MESSAGES_RECEIVED_COUNTER.increment(1);
        trace!("Received text message: {}", text);

        let envelope = match EventEnvelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                PROTOCOL_ERROR_COUNTER.increment(1);
                warn!(
                    "Discarding event channel message: {}. Message: {}",
                    e,
                    text.chars().take(100).collect::<String>()
                );
                return self.is_current(generation);
            }
        };

        trace!(kind = envelope.kind(), "Dispatching event channel message");
        match envelope {
            EventEnvelope::NewAlert(alert) => {
                ALERT_COUNTER.increment(1);
                debug!(
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    track_id = alert.track_id,
                    "Alert received"
                );
                self.dispatch(generation, |callbacks| callbacks.emit_new_alert(alert))
            }
            EventEnvelope::ConfigUpdated(config) => {
                info!(camera_source = %config.camera_source, "Detection configuration updated");
                self.dispatch(generation, |callbacks| callbacks.emit_config_updated(config))
            }
            EventEnvelope::CameraChanged(source) => {
                info!(%source, "Camera source changed");
                self.dispatch(generation, |callbacks| callbacks.emit_camera_changed(source))
            }
            EventEnvelope::ServerError(message) => {
                warn!("Backend reported an error: {}", message);
                self.dispatch(generation, |callbacks| {
                    callbacks.emit_error(ChannelError::server(message))
                })
            }
            EventEnvelope::Unrecognized(keys) => {
                debug!(?keys, "Ignoring unrecognized event channel message");
                self.is_current(generation)
            }
        }
    }

    fn handle_close(self: &Arc<Self>, generation: u64, reason: CloseReason) {
        {
            let mut state = self.lock_state();
            if !state.is_current(generation) || !reason.should_reconnect() {
                return;
            }
            state.mark_lost();
            let inner = Arc::clone(self);
            state
                .reconnect
                .arm(self.reconnect_delay, move || inner.fire_reconnect(generation));
        }

        CONNECTED_GAUGE.set(0.0);
        warn!(
            "Event channel {}; reconnecting in {} seconds",
            reason,
            self.reconnect_delay.as_secs_f64()
        );
        self.dispatch(generation, |callbacks| callbacks.emit_disconnect(reason));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock_state();
        if !state.is_current(generation) {
            return;
        }
        state.reconnect.release();
        RECONNECT_COUNTER.increment(1);
        self.start_session(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SurveillanceError};
    use crate::transport::TransportPeer;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct MockConnector {
        attempts: Arc<AtomicUsize>,
        refuse: Arc<AtomicBool>,
        peers: mpsc::UnboundedSender<TransportPeer>,
    }

    impl Connector for MockConnector {
        async fn connect(&self, _url: &Url) -> Result<Transport> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.refuse.load(Ordering::SeqCst) {
                return Err(SurveillanceError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }
            let (transport, peer) = Transport::in_memory();
            let _ = self.peers.send(peer);
            Ok(transport)
        }
    }

    struct Harness {
        client: EventChannelClient<MockConnector>,
        connector: MockConnector,
        peers: mpsc::UnboundedReceiver<TransportPeer>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn new() -> Self {
            let (peers_tx, peers) = mpsc::unbounded_channel();
            let connector = MockConnector {
                attempts: Arc::new(AtomicUsize::new(0)),
                refuse: Arc::new(AtomicBool::new(false)),
                peers: peers_tx,
            };
            let config = ChannelConfig {
                url: Url::parse("ws://backend.test/ws").unwrap(),
                reconnect_delay: Duration::from_secs(5),
            };
            let client = EventChannelClient::with_connector(&config, connector.clone());
            let log = Arc::new(Mutex::new(Vec::new()));
            client.set_callbacks(recording_callbacks(&log));
            Self {
                client,
                connector,
                peers,
                log,
            }
        }

        fn attempts(&self) -> usize {
            self.connector.attempts.load(Ordering::SeqCst)
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        async fn connected_peer(&mut self) -> TransportPeer {
            self.client.connect();
            let peer = self.peers.recv().await.expect("connector should be called");
            settle().await;
            assert!(self.client.is_connected());
            peer
        }
    }

    fn recording_callbacks(log: &Arc<Mutex<Vec<String>>>) -> CallbackRegistry {
        let (a, b, c, d, e, f) = (
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
        );
        CallbackRegistry::new()
            .on_connect(move || a.lock().unwrap().push("connect".into()))
            .on_new_alert(move |alert| b.lock().unwrap().push(format!("alert:{}", alert.id)))
            .on_config_updated(move |config| {
                c.lock()
                    .unwrap()
                    .push(format!("config:{}", config.pacing_threshold))
            })
            .on_camera_changed(move |source| d.lock().unwrap().push(format!("camera:{source}")))
            .on_error(move |error| {
                e.lock()
                    .unwrap()
                    .push(format!("error:{:?}:{}", error.kind, error.message))
            })
            .on_disconnect(move |reason| f.lock().unwrap().push(format!("disconnect:{reason}")))
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn alert(id: &str) -> String {
        json!({
            "new_alert": {
                "id": id,
                "type": "intrusion",
                "track_id": 4,
                "timestamp": 1_700_000_000.0,
                "location": [10.0, 20.0],
                "zone_name": "gate"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn dispatches_in_arrival_order() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;

        peer.push(alert("a-1"));
        peer.push(r#"{"config_updated": {"pacing_threshold": 6}}"#);
        peer.push(r#"{"camera_changed": "2"}"#);
        peer.push(alert("a-2"));
        peer.push(r#"{"error": "disk full"}"#);
        settle().await;

        assert_eq!(
            h.log(),
            vec![
                "connect",
                "alert:a-1",
                "config:6",
                "camera:2",
                "alert:a-2",
                "error:Server:disk full"
            ]
        );
    }

    #[tokio::test]
    async fn malformed_messages_are_inert() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;

        peer.push("not json at all");
        peer.push(r#"{"new_alert": {"id": 9}}"#);
        peer.push(r#"{"new_alert": {}, "error": "x"}"#);
        peer.push(r#"{"heartbeat": true}"#);
        settle().await;

        assert_eq!(h.log(), vec!["connect"]);
        assert!(h.client.is_connected());
        assert!(!h.client.is_reconnect_pending());

        // the channel survives and keeps delivering
        peer.push(alert("a-3"));
        settle().await;
        assert_eq!(h.log(), vec!["connect", "alert:a-3"]);
    }

    #[tokio::test]
    async fn unregistered_kinds_are_ignored() {
        let mut h = Harness::new();
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = connects.clone();
        h.client.set_callbacks(CallbackRegistry::new().on_connect(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let peer = h.connected_peer().await;
        peer.push(alert("a-1"));
        peer.push(r#"{"camera_changed": "1"}"#);
        settle().await;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(h.client.is_connected());
        assert!(h.log().is_empty());
    }

    #[tokio::test]
    async fn replaced_callbacks_take_effect_immediately() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;

        let replacement = Arc::new(Mutex::new(Vec::new()));
        h.client.set_callbacks(recording_callbacks(&replacement));
        peer.push(alert("a-5"));
        settle().await;

        assert_eq!(h.log(), vec!["connect"]);
        assert_eq!(*replacement.lock().unwrap(), vec!["alert:a-5".to_string()]);
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let mut h = Harness::new();
        h.client.connect();
        h.client.connect();
        let _peer = h.peers.recv().await.unwrap();
        settle().await;
        h.client.connect();
        settle().await;

        assert_eq!(h.attempts(), 1);
        assert_eq!(h.log(), vec!["connect"]);
    }

    #[tokio::test]
    async fn send_only_reaches_transport_while_connected() {
        let mut h = Harness::new();
        h.client.send_message(&json!({ "config": {} }));
        assert_eq!(h.attempts(), 0);

        let mut peer = h.connected_peer().await;
        h.client.update_config(&DetectionConfig::default());
        h.client.change_camera("rtsp://cam-2");
        let sent: serde_json::Value = serde_json::from_str(&peer.sent.recv().await.unwrap()).unwrap();
        assert_eq!(sent["config"]["camera_source"], "0");
        assert_eq!(
            peer.sent.recv().await.as_deref(),
            Some(r#"{"camera_source":"rtsp://cam-2"}"#)
        );

        peer.close(CloseReason::Remote(None));
        settle().await;
        assert!(!h.client.is_connected());

        h.client.send_message(&json!({ "config": {} }));
        assert!(peer.sent.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_reconnects_after_fixed_delay() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;

        peer.close(CloseReason::Remote(Some("restart".into())));
        settle().await;

        assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
        assert!(h.client.is_reconnect_pending());
        assert_eq!(h.client.reconnect_attempts(), 1);
        assert_eq!(
            h.log(),
            vec!["connect", "disconnect:closed by server: restart"]
        );

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(h.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let _peer = h.peers.recv().await.unwrap();
        settle().await;

        assert_eq!(h.attempts(), 2);
        assert!(h.client.is_connected());
        assert!(!h.client.is_reconnect_pending());
        assert_eq!(h.client.reconnect_attempts(), 0);
        assert_eq!(h.log().last().map(String::as_str), Some("connect"));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_disarms_pending_reconnect() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;
        peer.close(CloseReason::Remote(None));
        settle().await;
        assert!(h.client.is_reconnect_pending());

        h.client.disconnect();
        assert!(!h.client.is_reconnect_pending());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.attempts(), 1);
        // already disconnected, so no second disconnect notification
        assert_eq!(h.log(), vec!["connect", "disconnect:closed by server"]);
    }

    #[tokio::test(start_paused = true)]
    async fn requested_disconnect_never_reconnects() {
        let mut h = Harness::new();
        let mut peer = h.connected_peer().await;

        h.client.disconnect();
        assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
        assert!(!h.client.is_reconnect_pending());
        // transport released
        assert_eq!(peer.sent.recv().await, None);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.attempts(), 1);
        assert_eq!(h.log(), vec!["connect", "disconnect:closed by client"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_open_reports_error_and_retries_indefinitely() {
        let mut h = Harness::new();
        h.connector.refuse.store(true, Ordering::SeqCst);

        h.client.connect();
        settle().await;
        assert!(h.client.is_reconnect_pending());

        tokio::time::sleep(Duration::from_millis(5_001)).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(5_001)).await;
        settle().await;
        assert_eq!(h.attempts(), 3);
        assert_eq!(h.client.reconnect_attempts(), 3);

        let log = h.log();
        assert!(log[0].starts_with("error:Transport:"), "{log:?}");
        assert!(log[1].starts_with("disconnect:transport failed"), "{log:?}");

        h.connector.refuse.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5_001)).await;
        let _peer = h.peers.recv().await.unwrap();
        settle().await;
        assert!(h.client.is_connected());
        assert_eq!(h.attempts(), 4);
    }

    #[tokio::test]
    async fn callback_may_disconnect_the_channel() {
        let mut h = Harness::new();
        let client = h.client.clone();
        let (a, b, c) = (h.log.clone(), h.log.clone(), h.log.clone());
        h.client.set_callbacks(
            CallbackRegistry::new()
                .on_connect(move || a.lock().unwrap().push("connect".into()))
                .on_new_alert(move |alert| {
                    b.lock().unwrap().push(format!("alert:{}", alert.id));
                    client.disconnect();
                })
                .on_disconnect(move |reason| c.lock().unwrap().push(format!("disconnect:{reason}"))),
        );

        let peer = h.connected_peer().await;
        peer.push(alert("a-1"));
        peer.push(alert("a-2"));
        settle().await;

        assert_eq!(
            h.log(),
            vec!["connect", "alert:a-1", "disconnect:closed by client"]
        );
        assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
        assert!(!h.client.is_reconnect_pending());
        assert_eq!(h.attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disconnect_waits_for_a_running_callback() {
        let mut h = Harness::new();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (a, b, c) = (h.log.clone(), h.log.clone(), h.log.clone());
        h.client.set_callbacks(
            CallbackRegistry::new()
                .on_connect(move || a.lock().unwrap().push("connect".into()))
                .on_new_alert(move |alert| {
                    let _ = entered_tx.send(());
                    std::thread::sleep(Duration::from_millis(200));
                    b.lock().unwrap().push(format!("alert:{}", alert.id));
                })
                .on_disconnect(move |reason| c.lock().unwrap().push(format!("disconnect:{reason}"))),
        );

        h.client.connect();
        let peer = h.peers.recv().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !h.client.is_connected() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        peer.push(alert("a-1"));
        peer.push(alert("a-2"));
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();

        h.client.disconnect();
        h.log.lock().unwrap().push("disconnect returned".into());
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            h.log(),
            vec![
                "connect",
                "alert:a-1",
                "disconnect:closed by client",
                "disconnect returned"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_alone_does_not_change_state() {
        let mut h = Harness::new();
        let peer = h.connected_peer().await;

        peer.events
            .send(TransportEvent::Error("broken pipe".into()))
            .unwrap();
        settle().await;

        assert!(h.client.is_connected());
        assert!(!h.client.is_reconnect_pending());
        assert_eq!(h.log(), vec!["connect", "error:Transport:broken pipe"]);
    }
}

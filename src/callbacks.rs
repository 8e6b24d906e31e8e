//! Handlers for event channel deliveries and connection lifecycle.
//!
//! A [`CallbackRegistry`] holds at most one handler per event kind. The registry is
//! handed to [`EventChannelClient::set_callbacks`](crate::channel::EventChannelClient::set_callbacks)
//! as a whole and replaces the previous one; handlers that are not registered turn the
//! matching deliveries into no-ops.
//!
//! ```rust
//! use rs_surveillance::callbacks::CallbackRegistry;
//!
//! let callbacks = CallbackRegistry::new()
//!     .on_connect(|| println!("channel up"))
//!     .on_new_alert(|alert| println!("{} on track {}", alert.alert_type, alert.track_id))
//!     .on_disconnect(|reason| println!("channel down: {reason}"));
//! assert!(format!("{callbacks:?}").contains("on_connect: true"));
//! ```

use crate::types::{Alert, DetectionConfig};
use std::fmt;
use std::sync::Arc;

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by [`disconnect`](crate::channel::EventChannelClient::disconnect).
    Requested,
    /// The peer closed the socket or the stream ended.
    Remote(Option<String>),
    /// The transport could not be opened or broke.
    Failed(String),
}

impl CloseReason {
    /// Only closes we did not ask for schedule a reconnect.
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, CloseReason::Requested)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Requested => write!(f, "closed by client"),
            CloseReason::Remote(Some(reason)) => write!(f, "closed by server: {reason}"),
            CloseReason::Remote(None) => write!(f, "closed by server"),
            CloseReason::Failed(error) => write!(f, "transport failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorKind {
    /// Socket-level failure; the client recovers by reconnecting.
    Transport,
    /// An `error` envelope pushed by the backend.
    Server,
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    pub kind: ChannelErrorKind,
    pub message: String,
}

impl ChannelError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ChannelErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self {
            kind: ChannelErrorKind::Server,
            message: message.into(),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type OnAlertCallback = Arc<dyn Fn(Alert) + Send + Sync>;
pub type OnConfigCallback = Arc<dyn Fn(DetectionConfig) + Send + Sync>;
pub type OnCameraCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnDisconnectCallback = Arc<dyn Fn(CloseReason) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(ChannelError) + Send + Sync>;

/// Event channel handlers. All optional.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    pub(crate) on_new_alert: Option<OnAlertCallback>,
    pub(crate) on_config_updated: Option<OnConfigCallback>,
    pub(crate) on_camera_changed: Option<OnCameraCallback>,
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("on_new_alert", &self.on_new_alert.is_some())
            .field("on_config_updated", &self.on_config_updated.is_some())
            .field("on_camera_changed", &self.on_camera_changed.is_some())
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_new_alert(mut self, f: impl Fn(Alert) + Send + Sync + 'static) -> Self {
        self.on_new_alert = Some(Arc::new(f));
        self
    }

    pub fn on_config_updated(mut self, f: impl Fn(DetectionConfig) + Send + Sync + 'static) -> Self {
        self.on_config_updated = Some(Arc::new(f));
        self
    }

    pub fn on_camera_changed(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_camera_changed = Some(Arc::new(f));
        self
    }

    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Fired on every unexpected close, and on `disconnect()` of a live connection.
    pub fn on_disconnect(mut self, f: impl Fn(CloseReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Fired for transport errors and for `error` envelopes from the backend.
    pub fn on_error(mut self, f: impl Fn(ChannelError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_new_alert(&self, alert: Alert) {
        if let Some(cb) = &self.on_new_alert {
            cb(alert);
        }
    }

    pub(crate) fn emit_config_updated(&self, config: DetectionConfig) {
        if let Some(cb) = &self.on_config_updated {
            cb(config);
        }
    }

    pub(crate) fn emit_camera_changed(&self, source: String) {
        if let Some(cb) = &self.on_camera_changed {
            cb(source);
        }
    }

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: CloseReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ChannelError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }
}

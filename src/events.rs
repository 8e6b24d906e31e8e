/// file: src/events.rs
/// description: event bus between the realtime clients and the dashboard UI
use crate::{
    callbacks::{CallbackRegistry, ChannelError, CloseReason},
    frames::{FrameDisplay, FrameEvent, FrameTransportMode},
    types::{Alert, DetectionConfig},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    ChannelConnected,
    ChannelDisconnected(CloseReason),
    ChannelError(ChannelError),
    AlertReceived(Box<Alert>),
    ConfigUpdated(Box<DetectionConfig>),
    CameraChanged(String),
    // frame bytes stay with the display; the UI only tracks throughput
    FrameReceived { mime: String, bytes: usize },
    FrameModeChanged(FrameTransportMode),
    FrameFetchFailed(String),
    Stopping,
}

// Frames arrive at up to ~10/s while polling and faster while streaming
const FRAME_LANE_CAPACITY: usize = 1_024;

/// Sending half of the dashboard bus.
///
/// Channel and state events travel on an unbounded lane and are never
/// dropped. Frame notifications travel on a bounded lane and are shed when
/// the UI falls behind.
#[derive(Debug, Clone)]
pub struct EventSender {
    events: mpsc::UnboundedSender<DashboardEvent>,
    frames: mpsc::Sender<DashboardEvent>,
}

impl EventSender {
    /// Queues an event that must reach the UI. Returns false once the UI is gone.
    pub fn send(&self, event: DashboardEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn send_frame(&self, event: DashboardEvent) {
        match self.frames.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("Frame lane full, dropping frame notification"),
            // UI already gone during shutdown
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Receiving half of the dashboard bus. Pending channel and state events
/// are always delivered ahead of queued frames.
#[derive(Debug)]
pub struct EventReceiver {
    events: mpsc::UnboundedReceiver<DashboardEvent>,
    frames: mpsc::Receiver<DashboardEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<DashboardEvent> {
        tokio::select! {
            biased;
            Some(event) = self.events.recv() => Some(event),
            Some(event) = self.frames.recv() => Some(event),
            else => None,
        }
    }
}

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::channel(FRAME_LANE_CAPACITY);
    (
        EventSender {
            events: events_tx,
            frames: frames_tx,
        },
        EventReceiver {
            events: events_rx,
            frames: frames_rx,
        },
    )
}

fn forward(sender: &EventSender, event: DashboardEvent) {
    if !sender.send(event) {
        warn!("Dashboard UI has stopped, event discarded");
    }
}

/// Event channel callbacks that forward everything onto the bus.
pub fn channel_callbacks(sender: EventSender) -> CallbackRegistry {
    let (alerts, configs, cameras, connects, disconnects, errors) = (
        sender.clone(),
        sender.clone(),
        sender.clone(),
        sender.clone(),
        sender.clone(),
        sender,
    );

    CallbackRegistry::new()
        .on_new_alert(move |alert| forward(&alerts, DashboardEvent::AlertReceived(Box::new(alert))))
        .on_config_updated(move |config| {
            forward(&configs, DashboardEvent::ConfigUpdated(Box::new(config)))
        })
        .on_camera_changed(move |source| forward(&cameras, DashboardEvent::CameraChanged(source)))
        .on_connect(move || forward(&connects, DashboardEvent::ChannelConnected))
        .on_disconnect(move |reason| {
            forward(&disconnects, DashboardEvent::ChannelDisconnected(reason))
        })
        .on_error(move |error| forward(&errors, DashboardEvent::ChannelError(error)))
}

/// Frame display that reports frames and transport changes onto the bus.
pub fn frame_display(sender: EventSender) -> FrameDisplay {
    Arc::new(move |event| match event {
        FrameEvent::Frame(frame) => sender.send_frame(DashboardEvent::FrameReceived {
            bytes: frame.len(),
            mime: frame.mime,
        }),
        FrameEvent::ModeChanged(mode) => {
            sender.send(DashboardEvent::FrameModeChanged(mode));
        }
        FrameEvent::FetchFailed(message) => {
            sender.send(DashboardEvent::FrameFetchFailed(message));
        }
    })
}

use crate::error::SurveillanceError;
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_channel_messages_received_total"));
pub static MESSAGES_SENT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_channel_messages_sent_total"));
pub static PROTOCOL_ERROR_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_channel_protocol_errors_total"));
pub static ALERT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_alerts_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_channel_reconnects_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("surveillance_channel_connected"));
pub static FRAME_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_frames_displayed_total"));
pub static FRAME_FETCH_FAILURE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("surveillance_frame_fetch_failures_total"));
// 0 = streaming, 1 = polling
pub static FRAME_MODE_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("surveillance_frame_transport_polling"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "rs-surveillance")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            MESSAGES_RECEIVED_COUNTER.absolute(0);
            MESSAGES_SENT_COUNTER.absolute(0);
            PROTOCOL_ERROR_COUNTER.absolute(0);
            ALERT_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);
            FRAME_COUNTER.absolute(0);
            FRAME_FETCH_FAILURE_COUNTER.absolute(0);
            FRAME_MODE_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(SurveillanceError::MetricsError(e.to_string()).into())
        }
    }
}

/// Session summary the dashboard keeps while it runs.
#[derive(Debug)]
pub struct HealthStatus {
    pub channel_connected: bool,
    pub frame_mode: Option<&'static str>,
    pub feed_degraded: bool,
    pub last_alert_time: Option<chrono::DateTime<chrono::Utc>>,
    pub total_alerts: u64,
    pub frames_displayed: u64,
    pub disconnect_count: u64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            channel_connected: false,
            frame_mode: None,
            feed_degraded: false,
            last_alert_time: None,
            total_alerts: 0,
            frames_displayed: 0,
            disconnect_count: 0,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.channel_connected && !self.feed_degraded
    }

    pub fn uptime(&self) -> chrono::Duration {
        chrono::Utc::now() - self.started_at
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.is_healthy() { "healthy" } else { "degraded" },
            "channel_connected": self.channel_connected,
            "frame_mode": self.frame_mode,
            "feed_degraded": self.feed_degraded,
            "last_alert_time": self.last_alert_time,
            "total_alerts": self.total_alerts,
            "frames_displayed": self.frames_displayed,
            "disconnect_count": self.disconnect_count,
            "uptime_seconds": self.uptime().num_seconds(),
            "timestamp": chrono::Utc::now()
        })
    }
}

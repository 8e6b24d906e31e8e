/// file: src/ui.rs
/// description: terminal dashboard that renders events from the realtime clients
use crate::{
    alerts::AlertLog,
    callbacks::{ChannelErrorKind, CloseReason},
    events::{DashboardEvent, EventReceiver},
    formatter::{AlertFormatter, Colors, OutputFormat},
    frames::FrameTransportMode,
    monitoring::HealthStatus,
    types::DetectionConfig,
};
use std::time::Duration;
use tracing::{debug, info};

pub struct UIController {
    event_receiver: EventReceiver,
    alert_formatter: AlertFormatter,
    alert_log: AlertLog,
    health: HealthStatus,
    quiet_mode: bool,
    colored: bool,
    header_printed: bool,
    max_alerts: Option<u64>,
    reconnect_delay: Duration,
    config: Option<DetectionConfig>,
}

pub struct UIOptions {
    pub colored: bool,
    pub quiet: bool,
    pub max_alerts: u64,
    pub reconnect_delay: Duration,
}

impl UIController {
    pub fn new(
        event_receiver: EventReceiver,
        format: OutputFormat,
        options: UIOptions,
        alert_log: AlertLog,
    ) -> Self {
        Self {
            event_receiver,
            alert_formatter: AlertFormatter::new(format, options.colored, options.quiet),
            alert_log,
            health: HealthStatus::new(),
            quiet_mode: options.quiet,
            colored: options.colored,
            header_printed: false,
            max_alerts: if options.max_alerts == 0 {
                None
            } else {
                Some(options.max_alerts)
            },
            reconnect_delay: options.reconnect_delay,
            config: None,
        }
    }

    pub fn health(&self) -> &HealthStatus {
        &self.health
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alert_log
    }

    /// Renders events until the bus closes, a `Stopping` event arrives or the alert
    /// limit is reached.
    pub async fn run(&mut self) {
        self.print_startup_banner();
        self.print_history();
        while let Some(event) = self.event_receiver.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
    }

    fn handle_event(&mut self, event: DashboardEvent) -> bool {
        match event {
            DashboardEvent::ChannelConnected => {
                self.health.channel_connected = true;
                self.print_status("CONNECTED", "Event channel open");
            }
            DashboardEvent::ChannelDisconnected(reason) => {
                self.health.channel_connected = false;
                self.health.disconnect_count += 1;
                self.print_status("DISCONNECTED", &reason.to_string());
                if reason != CloseReason::Requested {
                    self.print_status(
                        "RECONNECTING",
                        &format!("Next attempt in {}s", self.reconnect_delay.as_secs()),
                    );
                }
            }
            DashboardEvent::ChannelError(error) => {
                let label = match error.kind {
                    ChannelErrorKind::Transport => "CHANNEL ERROR",
                    ChannelErrorKind::Server => "BACKEND ERROR",
                };
                self.print_error(label, &error.message);
            }
            DashboardEvent::AlertReceived(alert) => {
                if !self.alert_log.push((*alert).clone()) {
                    debug!(alert_id = %alert.id, "Duplicate alert ignored");
                    return true;
                }
                self.health.total_alerts += 1;
                self.health.last_alert_time = Some(alert.datetime_utc());

                if !self.header_printed {
                    self.alert_formatter.print_header();
                    self.header_printed = true;
                }
                self.alert_formatter.print_alert(&alert);

                if let Some(max_alerts) = self.max_alerts
                    && self.alert_formatter.alert_count() >= max_alerts
                {
                    self.print_status(
                        "STOPPING",
                        &format!("Reached configured max alerts ({max_alerts})"),
                    );
                    return false;
                }
            }
            DashboardEvent::ConfigUpdated(config) => {
                // pushed updates and periodic refreshes report the same config
                if self.config.as_ref() != Some(&*config) {
                    self.print_status("CONFIG", &describe_config(&config));
                    self.config = Some(*config);
                }
            }
            DashboardEvent::CameraChanged(source) => {
                self.print_status("CAMERA", &format!("Source switched to {source}"));
            }
            DashboardEvent::FrameReceived { mime, bytes } => {
                self.health.frames_displayed += 1;
                if self.health.frame_mode.is_none() {
                    self.health.frame_mode = Some(FrameTransportMode::Streaming.as_str());
                }
                if self.health.feed_degraded {
                    self.health.feed_degraded = false;
                    self.print_status("FEED", "Video feed restored");
                }
                debug!(%mime, bytes, "Frame displayed");
            }
            DashboardEvent::FrameModeChanged(mode) => {
                self.health.frame_mode = Some(mode.as_str());
                self.print_status(
                    "FEED",
                    &format!("Video transport switched to {mode}; stream unavailable"),
                );
            }
            DashboardEvent::FrameFetchFailed(message) => {
                if !self.health.feed_degraded {
                    self.health.feed_degraded = true;
                    self.print_error("FEED DEGRADED", &message);
                }
            }
            DashboardEvent::Stopping => {
                self.print_status("STOPPING", "Dashboard shutting down");
                return false;
            }
        }

        true
    }

    fn print_startup_banner(&self) {
        if self.quiet_mode {
            return;
        }
        let (bold, cyan, reset) = self.paint(Colors::BRIGHT_CYAN);

        println!();
        println!(
            "{}{}╔══════════════════════════════════════════════════════════════════════════════╗{}",
            bold, cyan, reset
        );
        println!(
            "{}{}║                          SURVEILLANCE DASHBOARD                             ║{}",
            bold, cyan, reset
        );
        println!(
            "{}{}╚══════════════════════════════════════════════════════════════════════════════╝{}",
            bold, cyan, reset
        );
        println!(" Version {}", env!("CARGO_PKG_VERSION"));
        println!();
    }

    fn print_history(&self) {
        if self.quiet_mode || self.alert_log.is_empty() {
            return;
        }
        self.print_status(
            "HISTORY",
            &format!("{} recent alerts", self.alert_log.len()),
        );
        self.alert_formatter.print_header();
        for alert in self.alert_log.iter() {
            self.alert_formatter.print_history_alert(alert);
        }
        println!();
    }

    pub fn print_summary(&self) {
        self.alert_formatter.print_summary(
            self.health.total_alerts,
            self.health.frames_displayed,
            self.health.uptime().num_seconds().max(0) as u64,
        );
        info!(health = %self.health.to_json(), "Session summary");
    }

    fn print_status(&self, status: &str, message: &str) {
        if self.quiet_mode {
            return;
        }

        let (color, symbol) = match status {
            "CONNECTED" => (Colors::BRIGHT_GREEN, "+"),
            "RECONNECTING" => (Colors::BRIGHT_YELLOW, "*"),
            "DISCONNECTED" => (Colors::BRIGHT_RED, "X"),
            "CONFIG" | "CAMERA" => (Colors::BRIGHT_BLUE, "~"),
            "FEED" => (Colors::BRIGHT_YELLOW, ">"),
            "STOPPING" => (Colors::BRIGHT_MAGENTA, "!"),
            _ => (Colors::WHITE, "-"),
        };
        let (bold, color, reset) = self.paint(color);
        let white = if self.colored { Colors::WHITE } else { "" };

        println!(
            "{}{}[{}]{} {} {}{}{}",
            bold, color, status, reset, symbol, white, message, reset
        );
    }

    fn print_error(&self, error_type: &str, message: &str) {
        let (bold, color, reset) = self.paint(Colors::BRIGHT_RED);
        let red = if self.colored { Colors::RED } else { "" };
        println!(
            "{}{}[{}]{} ! {}{}{}",
            bold, color, error_type, reset, red, message, reset
        );
    }

    fn paint(&self, color: &'static str) -> (&'static str, &'static str, &'static str) {
        if self.colored {
            (Colors::BOLD, color, Colors::RESET)
        } else {
            ("", "", "")
        }
    }
}

fn describe_config(config: &DetectionConfig) -> String {
    let zones = if config.zones_enabled {
        format!(
            "{}/{} zones active",
            config.active_zones().count(),
            config.intrusion_zones.len()
        )
    } else {
        "zones disabled".to_string()
    };
    format!(
        "loitering {}s, pacing {}, confidence {:.2}, {}, camera {}",
        config.loitering_threshold,
        config.pacing_threshold,
        config.confidence_threshold,
        zones,
        config.camera_source
    )
}

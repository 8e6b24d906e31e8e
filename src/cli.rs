use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "rs-surveillance",
    about = "realtime terminal dashboard for a surveillance backend: live alerts, config updates and video feed health",
    version
)]
pub struct Args {
    /// Backend base URL (the event channel lives at <url>/ws)
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Event channel reconnection delay in seconds
    #[arg(long, default_value = "5")]
    pub reconnect_delay: u64,

    /// Delay between successful frame polls in milliseconds
    #[arg(long, default_value = "100")]
    pub poll_interval_ms: u64,

    /// Delay before retrying a failed frame poll in milliseconds
    #[arg(long, default_value = "5000")]
    pub poll_retry_ms: u64,

    /// Do not acquire the video feed
    #[arg(long)]
    pub no_video: bool,

    /// Ask the backend to start processing on launch
    #[arg(long)]
    pub start_processing: bool,

    /// Seconds between detection configuration refreshes (0 to disable)
    #[arg(long, default_value = "5")]
    pub config_refresh_secs: u64,

    /// Number of recent alerts to load and keep
    #[arg(long, default_value = "20")]
    pub alert_history: usize,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - alerts only, no status lines
    #[arg(long)]
    pub quiet: bool,

    /// Stop after this many live alerts (0 for unlimited)
    #[arg(long, default_value = "0")]
    pub max_alerts: u64,
}

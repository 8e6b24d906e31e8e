/// file: src/config.rs
/// description: Runtime configuration derived from CLI arguments, endpoint URLs for the backend
use crate::{cli::Args, formatter::OutputFormat};
use anyhow::{Result, bail};
use std::time::Duration;
use url::Url;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub channel: ChannelConfig,
    pub frames: FrameConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub enabled: bool,
    pub stream_url: Url,
    pub frame_url: Url,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub start_processing: bool,
    pub alert_history: usize,
    /// Zero disables the periodic `/config` refresh.
    pub config_refresh: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
    pub max_alerts: u64,
}

impl ChannelConfig {
    pub fn new(base_url: &Url) -> Result<Self> {
        Ok(Self {
            url: websocket_url(base_url)?,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }
}

impl FrameConfig {
    pub fn new(base_url: &Url) -> Result<Self> {
        Ok(Self {
            enabled: true,
            stream_url: endpoint(base_url, "stream")?,
            frame_url: endpoint(base_url, "frame_base64")?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_POLL_RETRY_DELAY,
            request_timeout: Duration::from_secs(30),
        })
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let base_url = Url::parse(&args.url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("backend URL must be http or https, got {}", base_url);
        }

        let timeout = Duration::from_secs(args.timeout);

        Ok(Config {
            channel: ChannelConfig {
                reconnect_delay: Duration::from_secs(args.reconnect_delay),
                ..ChannelConfig::new(&base_url)?
            },
            frames: FrameConfig {
                enabled: !args.no_video,
                poll_interval: Duration::from_millis(args.poll_interval_ms),
                retry_delay: Duration::from_millis(args.poll_retry_ms),
                request_timeout: timeout,
                ..FrameConfig::new(&base_url)?
            },
            api: ApiConfig {
                base_url,
                timeout,
                start_processing: args.start_processing,
                alert_history: args.alert_history,
                config_refresh: Duration::from_secs(args.config_refresh_secs),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            display: DisplayConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
                quiet: args.quiet,
                max_alerts: args.max_alerts,
            },
        })
    }
}

/// Resolves `path` against the backend base URL, keeping any base path prefix.
pub fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path)?)
}

/// The event channel endpoint: `ws://` for `http://` backends, `wss://` for `https://`.
pub fn websocket_url(base_url: &Url) -> Result<Url> {
    let mut url = endpoint(base_url, "ws")?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    if url.set_scheme(scheme).is_err() {
        bail!("cannot derive websocket URL from {}", base_url);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn websocket_url_follows_http_scheme() {
        let base = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(websocket_url(&base).unwrap().as_str(), "ws://localhost:8000/ws");

        let secure = Url::parse("https://cams.example.com/api").unwrap();
        assert_eq!(
            websocket_url(&secure).unwrap().as_str(),
            "wss://cams.example.com/api/ws"
        );
    }

    #[test]
    fn frame_endpoints_keep_base_path() {
        let base = Url::parse("http://10.0.0.5:8000/guard/").unwrap();
        let frames = FrameConfig::new(&base).unwrap();
        assert_eq!(frames.stream_url.as_str(), "http://10.0.0.5:8000/guard/stream");
        assert_eq!(
            frames.frame_url.as_str(),
            "http://10.0.0.5:8000/guard/frame_base64"
        );
    }

    #[test]
    fn from_args_uses_reference_timings() {
        let args = Args::parse_from(["rs-surveillance"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.channel.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.frames.poll_interval, Duration::from_millis(100));
        assert_eq!(config.frames.retry_delay, Duration::from_millis(5000));
        assert!(config.frames.enabled);
        assert_eq!(config.api.config_refresh, Duration::from_secs(5));
        assert_eq!(config.channel.url.as_str(), "ws://localhost:8000/ws");
    }

    #[test]
    fn from_args_rejects_non_http_backend() {
        let args = Args::parse_from(["rs-surveillance", "--url", "ftp://example.com"]);
        assert!(Config::from_args(&args).is_err());
    }
}

// file: src/frames.rs
// description: video frame delivery: multipart streaming with a one-way fallback to polling

use crate::{
    config::FrameConfig,
    error::{Result, SurveillanceError},
    monitoring::{FRAME_COUNTER, FRAME_FETCH_FAILURE_COUNTER, FRAME_MODE_GAUGE},
    multipart::{MultipartReader, boundary_from_content_type},
    types::{Frame, FramePayload},
};
use reqwest::header::CONTENT_TYPE;
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameTransportMode {
    #[default]
    Streaming,
    Polling,
}

impl FrameTransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameTransportMode::Streaming => "streaming",
            FrameTransportMode::Polling => "polling",
        }
    }
}

impl fmt::Display for FrameTransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the display surface receives.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Frame(Frame),
    ModeChanged(FrameTransportMode),
    /// A poll failed; the feed is degraded until the next successful fetch.
    FetchFailed(String),
}

pub type FrameDisplay = Arc<dyn Fn(FrameEvent) + Send + Sync>;

/// Where frames come from.
pub trait FrameSource: Send + Sync + 'static {
    /// Delivers every frame of the continuous stream to `on_frame`. Returns once the
    /// stream stops delivering, `Ok` when it ended cleanly.
    fn stream(
        &self,
        on_frame: &(dyn Fn(Frame) + Send + Sync),
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetches a single frame.
    fn fetch(&self) -> impl Future<Output = Result<Frame>> + Send;
}

/// Backend frame endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFrameSource {
    client: reqwest::Client,
    stream_url: Url,
    frame_url: Url,
    request_timeout: Duration,
}

impl HttpFrameSource {
    pub fn new(config: &FrameConfig) -> Result<Self> {
        // no overall timeout on the client, the stream is open-ended
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            stream_url: config.stream_url.clone(),
            frame_url: config.frame_url.clone(),
            request_timeout: config.request_timeout,
        })
    }
}

impl FrameSource for HttpFrameSource {
    async fn stream(&self, on_frame: &(dyn Fn(Frame) + Send + Sync)) -> Result<()> {
        let mut response = self.client.get(self.stream_url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurveillanceError::FrameFetch {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let boundary = boundary_from_content_type(&content_type).ok_or_else(|| {
            SurveillanceError::UnsupportedStream(format!("content type {content_type:?}"))
        })?;

        debug!(url = %self.stream_url, %boundary, "Video stream opened");
        let mut reader = MultipartReader::new(&boundary);

        while let Some(chunk) = response.chunk().await? {
            for part in reader.push(&chunk)? {
                if part.body.is_empty() {
                    continue;
                }
                let mime = part.content_type.unwrap_or_else(|| "image/jpeg".to_string());
                on_frame(Frame::new(mime, part.body));
            }
            if reader.is_finished() {
                break;
            }
        }

        Ok(())
    }

    async fn fetch(&self) -> Result<Frame> {
        let response = self
            .client
            .get(self.frame_url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurveillanceError::FrameFetch {
                status: status.as_u16(),
            });
        }

        let payload: FramePayload = response.json().await?;
        Frame::from_data_url(&payload.frame)
    }
}

enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

struct Shared<S> {
    source: S,
    display: FrameDisplay,
    poll_interval: Duration,
    retry_delay: Duration,
    mode: watch::Sender<FrameTransportMode>,
}

/// Acquires successive frames for one display surface.
///
/// Starts on the continuous stream. The first streaming failure moves the client to
/// polling, where it stays for the rest of its life: going back to streaming takes a
/// new instance. Polls are strictly sequential, the next one is scheduled only after
/// the previous one resolved.
pub struct FrameDeliveryClient<S: FrameSource = HttpFrameSource> {
    shared: Arc<Shared<S>>,
    lifecycle: Mutex<Lifecycle>,
}

impl FrameDeliveryClient<HttpFrameSource> {
    pub fn new(config: &FrameConfig, display: FrameDisplay) -> Result<Self> {
        let source = HttpFrameSource::new(config)?;
        Ok(Self::with_source(config, source, display))
    }
}

impl<S: FrameSource> FrameDeliveryClient<S> {
    pub fn with_source(config: &FrameConfig, source: S, display: FrameDisplay) -> Self {
        let (mode, _) = watch::channel(FrameTransportMode::Streaming);
        Self {
            shared: Arc::new(Shared {
                source,
                display,
                poll_interval: config.poll_interval,
                retry_delay: config.retry_delay,
                mode,
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Starts delivery. Calling it again, or after `shutdown`, does nothing.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        match *lifecycle {
            Lifecycle::Idle => {
                info!("Starting video frame delivery");
                *lifecycle = Lifecycle::Running(tokio::spawn(Arc::clone(&self.shared).run()));
            }
            Lifecycle::Running(_) => debug!("Frame delivery already running"),
            Lifecycle::Stopped => warn!("Frame delivery was shut down; create a new client"),
        }
    }

    /// Cancels the pending fetch or timer. No event reaches the display afterwards.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Running(task) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            task.abort();
            info!(mode = %self.mode(), "Video frame delivery stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner),
            Lifecycle::Running(_)
        )
    }

    pub fn mode(&self) -> FrameTransportMode {
        *self.shared.mode.borrow()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<FrameTransportMode> {
        self.shared.mode.subscribe()
    }
}

impl<S: FrameSource> Drop for FrameDeliveryClient<S> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Running(task) = lifecycle {
            task.abort();
        }
    }
}

impl<S: FrameSource> Shared<S> {
    async fn run(self: Arc<Self>) {
        let display = &self.display;
        let on_frame = |frame: Frame| {
            FRAME_COUNTER.increment(1);
            display(FrameEvent::Frame(frame));
        };

        match self.source.stream(&on_frame).await {
            Ok(()) => warn!("Video stream ended; falling back to polling"),
            Err(e) => warn!("Video stream failed: {}; falling back to polling", e),
        }
        self.enter_polling();

        loop {
            match self.source.fetch().await {
                Ok(frame) => {
                    FRAME_COUNTER.increment(1);
                    (self.display)(FrameEvent::Frame(frame));
                    sleep(self.poll_interval).await;
                }
                Err(e) => {
                    FRAME_FETCH_FAILURE_COUNTER.increment(1);
                    warn!(
                        "Frame fetch failed: {}; retrying in {} ms",
                        e,
                        self.retry_delay.as_millis()
                    );
                    (self.display)(FrameEvent::FetchFailed(e.to_string()));
                    sleep(self.retry_delay).await;
                }
            }
        }
    }

    fn enter_polling(&self) {
        let previous = self.mode.send_replace(FrameTransportMode::Polling);
        if previous != FrameTransportMode::Polling {
            FRAME_MODE_GAUGE.set(1.0);
            (self.display)(FrameEvent::ModeChanged(FrameTransportMode::Polling));
        }
    }
}

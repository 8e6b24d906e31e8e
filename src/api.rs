// file: src/api.rs
// description: request/response client for the backend's configuration, alert and processing endpoints

use crate::{
    config::ApiConfig,
    error::{Result, SurveillanceError},
    types::{AlertPage, DetectionConfig, ErrorDetail},
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::{ParseError, Url};

/// Acknowledgement body of the command endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub async fn get_config(&self) -> Result<DetectionConfig> {
        self.send_json(self.request(Method::GET, &["config"])?).await
    }

    /// Fetches `/config` every `interval` and hands each result to `on_config`.
    /// Failed fetches are logged and retried on the next tick. Runs until dropped.
    pub async fn poll_config(&self, interval: Duration, on_config: impl Fn(DetectionConfig)) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.get_config().await {
                Ok(config) => on_config(config),
                Err(e) => warn!("Configuration refresh failed: {}", e),
            }
        }
    }

    /// Replaces the detection configuration; returns the configuration the backend applied.
    pub async fn update_config(&self, config: &DetectionConfig) -> Result<DetectionConfig> {
        let request = self.request(Method::POST, &["config"])?.json(config);
        let applied: DetectionConfig = self.send_json(request).await?;
        info!(camera_source = %applied.camera_source, "Detection configuration saved");
        Ok(applied)
    }

    pub async fn list_alerts(&self, limit: usize, offset: usize) -> Result<AlertPage> {
        let request = self
            .request(Method::GET, &["alerts"])?
            .query(&[("limit", limit), ("offset", offset)]);
        self.send_json(request).await
    }

    pub async fn delete_alert(&self, id: &str) -> Result<MessageResponse> {
        self.send_json(self.request(Method::DELETE, &["alerts", id])?).await
    }

    pub async fn clear_alerts(&self) -> Result<MessageResponse> {
        self.send_json(self.request(Method::DELETE, &["alerts"])?).await
    }

    /// Switches the camera through the request/response endpoint. The event channel
    /// offers the same operation as a fire-and-forget message.
    pub async fn change_camera(&self, source: &str) -> Result<MessageResponse> {
        self.send_json(self.request(Method::POST, &["camera", source])?).await
    }

    pub async fn start_processing(&self) -> Result<MessageResponse> {
        self.send_json(self.request(Method::POST, &["start"])?).await
    }

    pub async fn stop_processing(&self) -> Result<MessageResponse> {
        self.send_json(self.request(Method::POST, &["stop"])?).await
    }

    /// Reads the current configuration, flips the named zone and writes it back.
    pub async fn update_zone_status(&self, zone_name: &str, active: bool) -> Result<DetectionConfig> {
        let mut config = self.get_config().await?;
        if !config.set_zone_active(zone_name, active) {
            return Err(SurveillanceError::ApiError {
                status: 404,
                message: format!("zone {zone_name} not found"),
            });
        }
        self.update_config(&config).await
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "Backend request");
        Ok(self.client.request(method, url))
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded on its
    /// own, so camera URLs like `rtsp://host/stream` stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(ErrorDetail {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(SurveillanceError::ApiError {
        status: status.as_u16(),
        message,
    })
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveillanceError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Frame fetch failed with status {status}")]
    FrameFetch { status: u16 },

    #[error("Invalid frame payload: {0}")]
    InvalidFrame(String),

    #[error("Unsupported stream transport: {0}")]
    UnsupportedStream(String),

    #[error("Backend API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}

pub type Result<T> = std::result::Result<T, SurveillanceError>;

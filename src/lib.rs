#![doc = include_str!("../docs/rustdoc.md")]

/// Alert history kept by the dashboard.
pub mod alerts;
/// Request/response client for the backend HTTP endpoints.
pub mod api;
/// Event channel handlers and close reasons.
pub mod callbacks;
/// Event channel client with automatic reconnection.
pub mod channel;
/// Connection state and reconnect timer.
pub mod channel_state;
/// Command-line argument definitions.
pub mod cli;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between the clients and the UI.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Video frame delivery with polling fallback.
pub mod frames;
/// Metrics and health status structures.
pub mod monitoring;
/// Multipart stream parser.
pub mod multipart;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Event channel transport seam.
pub mod transport;
/// Backend data models and wire messages.
pub mod types;
/// UI controller and presentation loop.
pub mod ui;

/// Primary crate error type.
pub use error::SurveillanceError;

/// file: src/types.rs
/// description: wire types shared with the surveillance backend: alerts, detection config, event envelopes, frames
use crate::error::{Result, SurveillanceError};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Alert types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub track_id: i64,
    pub timestamp: f64, // unix seconds
    #[serde(default)]
    pub location: Vec<f64>,
    #[serde(default)]
    pub suspicion_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_changes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

impl Alert {
    pub fn datetime_utc(&self) -> DateTime<Utc> {
        let millis = (self.timestamp * 1000.0) as i64;
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    pub fn datetime_local(&self) -> DateTime<Local> {
        self.datetime_utc().with_timezone(&Local)
    }

    /// Human-readable detail column: zone for intrusions, duration for loitering, and so on.
    pub fn detail(&self) -> String {
        if let Some(zone) = &self.zone_name {
            return format!("zone {zone}");
        }
        if let Some(changes) = self.direction_changes {
            return format!("{changes} direction changes");
        }
        if let Some(duration) = self.duration {
            return format!("{duration:.1}s");
        }
        String::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// Detection configuration, mirrors the backend defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub points: Vec<Vec<f64>>,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub loitering_threshold: f64,
    pub pacing_threshold: i64,
    pub intrusion_zones: Vec<Zone>,
    pub zones_enabled: bool,
    pub confidence_threshold: f64,
    pub audio_alerts: bool,
    pub camera_source: String,
    pub quiet_period_start: String,
    pub quiet_period_end: String,
    pub quiet_period_enabled: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            loitering_threshold: 10.0,
            pacing_threshold: 3,
            intrusion_zones: Vec::new(),
            zones_enabled: true,
            confidence_threshold: 0.5,
            audio_alerts: true,
            camera_source: "0".to_string(),
            quiet_period_start: "22:00".to_string(),
            quiet_period_end: "06:00".to_string(),
            quiet_period_enabled: false,
        }
    }
}

impl DetectionConfig {
    pub fn active_zones(&self) -> impl Iterator<Item = &Zone> {
        self.intrusion_zones.iter().filter(|zone| zone.active)
    }

    /// Returns false when no zone carries `name`.
    pub fn set_zone_active(&mut self, name: &str, active: bool) -> bool {
        let mut found = false;
        for zone in self.intrusion_zones.iter_mut().filter(|z| z.name == name) {
            zone.active = active;
            found = true;
        }
        found
    }
}

fn default_true() -> bool {
    true
}

// Event channel messages
#[derive(Debug, Clone, PartialEq)]
pub enum EventEnvelope {
    NewAlert(Alert),
    ConfigUpdated(DetectionConfig),
    CameraChanged(String),
    ServerError(String),
    /// A well-formed object carrying none of the known keys.
    Unrecognized(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeTag {
    NewAlert,
    ConfigUpdated,
    CameraChanged,
    Error,
}

impl EnvelopeTag {
    const ALL: [EnvelopeTag; 4] = [
        EnvelopeTag::NewAlert,
        EnvelopeTag::ConfigUpdated,
        EnvelopeTag::CameraChanged,
        EnvelopeTag::Error,
    ];

    fn key(self) -> &'static str {
        match self {
            EnvelopeTag::NewAlert => "new_alert",
            EnvelopeTag::ConfigUpdated => "config_updated",
            EnvelopeTag::CameraChanged => "camera_changed",
            EnvelopeTag::Error => "error",
        }
    }
}

impl EventEnvelope {
    /// Decodes one inbound text frame.
    ///
    /// Exactly one known key with a non-null value selects the variant. Invalid JSON,
    /// non-object frames, payloads that do not match the tag's schema and frames
    /// carrying several known keys are all rejected as `InvalidMessage`.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SurveillanceError::InvalidMessage(format!("not JSON: {e}")))?;
        let Value::Object(mut fields) = value else {
            return Err(SurveillanceError::InvalidMessage(
                "expected a JSON object".to_string(),
            ));
        };

        let mut present = EnvelopeTag::ALL
            .into_iter()
            .filter(|tag| fields.get(tag.key()).is_some_and(|v| !v.is_null()));
        let Some(tag) = present.next() else {
            return Ok(EventEnvelope::Unrecognized(fields.keys().cloned().collect()));
        };
        if let Some(other) = present.next() {
            return Err(SurveillanceError::InvalidMessage(format!(
                "ambiguous envelope carries both `{}` and `{}`",
                tag.key(),
                other.key()
            )));
        }

        let payload = fields.remove(tag.key()).unwrap_or(Value::Null);
        let invalid = |e: serde_json::Error| {
            SurveillanceError::InvalidMessage(format!("`{}` payload: {e}", tag.key()))
        };

        Ok(match tag {
            EnvelopeTag::NewAlert => EventEnvelope::NewAlert(from_value(payload).map_err(invalid)?),
            EnvelopeTag::ConfigUpdated => {
                EventEnvelope::ConfigUpdated(from_value(payload).map_err(invalid)?)
            }
            EnvelopeTag::CameraChanged => {
                EventEnvelope::CameraChanged(scalar_string(payload).map_err(invalid)?)
            }
            EnvelopeTag::Error => EventEnvelope::ServerError(scalar_string(payload).map_err(invalid)?),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EventEnvelope::NewAlert(_) => "new_alert",
            EventEnvelope::ConfigUpdated(_) => "config_updated",
            EventEnvelope::CameraChanged(_) => "camera_changed",
            EventEnvelope::ServerError(_) => "error",
            EventEnvelope::Unrecognized(_) => "unrecognized",
        }
    }
}

fn from_value<T: for<'de> Deserialize<'de>>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(value)
}

// Camera sources come through as numbers for webcams and strings for files.
fn scalar_string(value: Value) -> serde_json::Result<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        other => serde_json::from_value(other),
    }
}

/// Outbound event channel frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundMessage {
    Config(DetectionConfig),
    CameraSource(String),
}

/// Raw body of a single-frame poll.
#[derive(Debug, Clone, Deserialize)]
pub struct FramePayload {
    pub frame: String,
}

/// A decoded video frame ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mime: String,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 payload (assumed JPEG).
    pub fn from_data_url(encoded: &str) -> Result<Self> {
        let (mime, payload) = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (meta, payload) = rest.split_once(',').ok_or_else(|| {
                    SurveillanceError::InvalidFrame("data URL without payload".to_string())
                })?;
                let mime = meta.strip_suffix(";base64").ok_or_else(|| {
                    SurveillanceError::InvalidFrame(format!("unsupported data URL encoding: {meta}"))
                })?;
                (if mime.is_empty() { "image/jpeg" } else { mime }, payload)
            }
            None => ("image/jpeg", encoded),
        };

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| SurveillanceError::InvalidFrame(e.to_string()))?;
        if data.is_empty() {
            return Err(SurveillanceError::InvalidFrame("empty frame".to_string()));
        }
        Ok(Frame::new(mime, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Error body returned by the backend for failed requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert_json() -> Value {
        json!({
            "id": "a-1",
            "type": "loitering",
            "track_id": 7,
            "timestamp": 1_700_000_000.5,
            "location": [120.0, 88.5],
            "suspicion_score": 0.82,
            "duration": 14.2
        })
    }

    #[test]
    fn decodes_each_known_tag() {
        let alert = EventEnvelope::decode(&json!({ "new_alert": alert_json() }).to_string()).unwrap();
        match alert {
            EventEnvelope::NewAlert(a) => {
                assert_eq!(a.id, "a-1");
                assert_eq!(a.alert_type, "loitering");
                assert_eq!(a.duration, Some(14.2));
                assert_eq!(a.zone_name, None);
            }
            other => panic!("unexpected envelope {other:?}"),
        }

        let config = EventEnvelope::decode(r#"{"config_updated": {"pacing_threshold": 5}}"#).unwrap();
        match config {
            EventEnvelope::ConfigUpdated(c) => {
                assert_eq!(c.pacing_threshold, 5);
                assert_eq!(c.camera_source, "0");
            }
            other => panic!("unexpected envelope {other:?}"),
        }

        assert_eq!(
            EventEnvelope::decode(r#"{"camera_changed": 2}"#).unwrap(),
            EventEnvelope::CameraChanged("2".to_string())
        );
        assert_eq!(
            EventEnvelope::decode(r#"{"error": "camera offline"}"#).unwrap(),
            EventEnvelope::ServerError("camera offline".to_string())
        );
    }

    #[test]
    fn unknown_keys_are_unrecognized_not_errors() {
        let envelope = EventEnvelope::decode(r#"{"heartbeat": 1}"#).unwrap();
        assert_eq!(envelope, EventEnvelope::Unrecognized(vec!["heartbeat".to_string()]));

        // null values do not count as a populated tag
        let envelope = EventEnvelope::decode(r#"{"new_alert": null}"#).unwrap();
        assert_eq!(envelope.kind(), "unrecognized");
    }

    #[test]
    fn malformed_frames_are_rejected() {
        for text in [
            "not json",
            "[1, 2, 3]",
            r#""new_alert""#,
            r#"{"new_alert": {"id": 3}}"#,
            r#"{"camera_changed": "1", "error": "boom"}"#,
        ] {
            assert!(
                matches!(EventEnvelope::decode(text), Err(SurveillanceError::InvalidMessage(_))),
                "expected rejection of {text}"
            );
        }
    }

    #[test]
    fn outbound_messages_use_backend_keys() {
        let config = serde_json::to_value(OutboundMessage::Config(DetectionConfig::default())).unwrap();
        assert_eq!(config["config"]["loitering_threshold"], json!(10.0));

        let camera = serde_json::to_value(OutboundMessage::CameraSource("1".into())).unwrap();
        assert_eq!(camera, json!({ "camera_source": "1" }));
    }

    #[test]
    fn frame_from_data_url() {
        let frame = Frame::from_data_url("data:image/jpeg;base64,/9j/4AA=").unwrap();
        assert_eq!(frame.mime, "image/jpeg");
        assert_eq!(frame.data, vec![0xff, 0xd8, 0xff, 0xe0, 0x00]);

        let bare = Frame::from_data_url("QQ==").unwrap();
        assert_eq!(bare.data, b"A".to_vec());

        assert!(Frame::from_data_url("data:image/png,raw").is_err());
        assert!(Frame::from_data_url("data:image/jpeg;base64,").is_err());
        assert!(Frame::from_data_url("data:image/jpeg;base64,!!!").is_err());
    }

    #[test]
    fn zone_toggling() {
        let mut config = DetectionConfig {
            intrusion_zones: vec![
                Zone { points: vec![vec![0.0, 0.0]], name: "gate".into(), active: true },
                Zone { points: vec![vec![1.0, 1.0]], name: "lot".into(), active: false },
            ],
            ..DetectionConfig::default()
        };
        assert!(config.set_zone_active("lot", true));
        assert!(!config.set_zone_active("roof", true));
        assert_eq!(config.active_zones().count(), 2);
    }

    #[test]
    fn alert_detail_prefers_zone() {
        let mut alert: Alert = serde_json::from_value(alert_json()).unwrap();
        assert_eq!(alert.detail(), "14.2s");
        alert.zone_name = Some("gate".into());
        assert_eq!(alert.detail(), "zone gate");
        assert_eq!(alert.datetime_utc().timestamp(), 1_700_000_000);
    }
}

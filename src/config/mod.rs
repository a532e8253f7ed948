//! Configuration module for the attendex application.
//!
//! Values come from the environment (after `.env` is loaded). Duration
//! settings accept either a bare number of seconds or a unit string such
//! as `8s` or `1m`.

use std::time::Duration;

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_TUTOR_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level for the application's own targets.
    ///
    /// Ignored when `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Postgres connection string.
    ///
    /// Without it, face identities live in memory and the `/api` data
    /// routes answer 503.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,

    /// Directory holding one `reid_{n}.jpg` crop per identity.
    #[serde(default = "default_face_image_dir")]
    pub face_image_dir: String,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_tracker_iou_threshold")]
    pub tracker_iou_threshold: f32,
    #[serde(default = "default_tracker_max_age")]
    pub tracker_max_age: u32,

    /// Base URL of the external detector/embedder.
    #[serde(default)]
    pub inference_url: Option<String>,
    #[serde(
        default = "default_inference_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub inference_timeout: Duration,

    #[serde(default = "default_tutor_api_url")]
    pub tutor_api_url: String,
    #[serde(default)]
    pub tutor_api_key: Option<String>,
    #[serde(default = "default_tutor_model")]
    pub tutor_model: String,
    #[serde(
        default = "default_tutor_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub tutor_timeout: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_face_image_dir() -> String {
    "saved_faces".to_string()
}

fn default_similarity_threshold() -> f32 {
    crate::face::registry::DEFAULT_SIMILARITY_THRESHOLD
}

fn default_tracker_iou_threshold() -> f32 {
    crate::face::tracker::DEFAULT_IOU_THRESHOLD
}

fn default_tracker_max_age() -> u32 {
    crate::face::tracker::DEFAULT_MAX_AGE
}

fn default_inference_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_tutor_api_url() -> String {
    DEFAULT_TUTOR_API_URL.to_string()
}

fn default_tutor_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_tutor_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Parse a duration string such as `8s`, `500ms` or a bare `8` (seconds).
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(value.trim())
        .map_err(|e| format!("invalid duration '{value}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{value}': {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

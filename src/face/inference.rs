//! Client side of the external face detector/embedder.
//!
//! Detection and embedding run in a separate inference service; this module
//! only knows its wire format.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::embedding::Embedding;
use super::geometry::BBox;
use super::image;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("no inference service is configured")]
    NotConfigured,
    #[error("inference request failed")]
    Request(#[from] reqwest::Error),
    #[error("inference service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed inference response: {0}")]
    Malformed(String),
}

/// One face found in a frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    /// Missing when the embedder could not process the crop.
    pub embedding: Option<Embedding>,
    /// JPEG crop of the face, saved when the face is first enrolled.
    pub crop: Option<Vec<u8>>,
}

#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, frame: &[u8]) -> Result<Vec<Detection>, InferenceError>;

    /// Short human-readable description for status pages.
    fn describe(&self) -> String;
}

/// Stand-in used when `INFERENCE_URL` is unset.
#[derive(Debug, Default)]
pub struct UnavailableDetector;

#[async_trait]
impl FaceDetector for UnavailableDetector {
    async fn detect(&self, _frame: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        Err(InferenceError::NotConfigured)
    }

    fn describe(&self) -> String {
        "unavailable".to_owned()
    }
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    faces: Vec<WireFace>,
    #[serde(default)]
    width: Option<i32>,
    #[serde(default)]
    height: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct WireFace {
    bbox: [f32; 4],
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    crop: Option<String>,
}

fn default_confidence() -> f32 {
    0.99
}

/// Talks to `POST {base}/detect` with the raw frame as the request body.
pub struct RemoteDetector {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl RemoteDetector {
    pub fn new(base_url: &url::Url, timeout: Duration) -> Result<Self, InferenceError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("detect")
            .map_err(|e| InferenceError::Malformed(format!("bad inference url: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl FaceDetector for RemoteDetector {
    async fn detect(&self, frame: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        let mime = image::ImageFormat::sniff(frame)
            .map(|f| f.mime())
            .unwrap_or("application/octet-stream");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(frame.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "inference service returned error");
            return Err(InferenceError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        debug!(faces = parsed.faces.len(), "inference response received");
        Ok(into_detections(parsed))
    }

    fn describe(&self) -> String {
        format!("remote ({})", self.endpoint)
    }
}

/// Detector coordinates outside the `i32` pixel range are treated as garbage.
fn to_pixel(value: f32) -> Option<i32> {
    (value.is_finite() && value.abs() < i32::MAX as f32).then_some(value as i32)
}

fn into_detections(response: DetectResponse) -> Vec<Detection> {
    let frame = response.width.zip(response.height);
    response
        .faces
        .into_iter()
        .filter_map(|face| {
            let [x1, y1, x2, y2] = face.bbox;
            let (Some(x1), Some(y1), Some(x2), Some(y2)) =
                (to_pixel(x1), to_pixel(y1), to_pixel(x2), to_pixel(y2))
            else {
                warn!(bbox = ?face.bbox, "discarding face with out-of-range box");
                return None;
            };
            let mut bbox = BBox::new(x1, y1, x2, y2);
            if let Some((w, h)) = frame {
                bbox = bbox.clamp(w, h);
            }
            if bbox.is_empty() {
                return None;
            }
            let crop = face.crop.as_deref().and_then(|c| match image::decode(c) {
                Ok(bytes) => Some(bytes),
                Err(_) => {
                    warn!(?bbox, "discarding undecodable face crop");
                    None
                }
            });
            Some(Detection {
                bbox,
                confidence: face.confidence,
                embedding: face.embedding.map(Embedding::new),
                crop,
            })
        })
        .collect()
}

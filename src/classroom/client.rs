//! HTTP client for the face-analysis endpoints.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ClassroomError;
use crate::face::FrameAnalysis;
use crate::face::engine::EngineStatus;
use crate::face::image::ImageFormat;
use crate::web::faces::{
    FaceImageResponse, RosterResponse, SuccessResponse, UnknownFacesResponse,
};

/// Error body returned by the service on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Clone)]
pub struct FaceApiClient {
    client: reqwest::Client,
    base: url::Url,
}

impl FaceApiClient {
    pub fn new(mut base: url::Url, timeout: Duration) -> Result<Self, ClassroomError> {
        // `join` replaces the last path segment unless the base ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<url::Url, ClassroomError> {
        Ok(self.base.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClassroomError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.detail.or(b.message))
            .unwrap_or_else(|| text.chars().take(200).collect());
        warn!(status = status.as_u16(), message = %message, "face api returned error");
        Err(ClassroomError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// `POST /analyze_frame`
    pub async fn analyze_frame(
        &self,
        frame: Vec<u8>,
        use_tracking: bool,
    ) -> Result<FrameAnalysis, ClassroomError> {
        let (file_name, mime) = match ImageFormat::sniff(&frame) {
            Some(ImageFormat::Png) => ("frame.png", "image/png"),
            _ => ("frame.jpg", "image/jpeg"),
        };
        let part = Part::bytes(frame).file_name(file_name).mime_str(mime)?;
        let form = Form::new()
            .part("file", part)
            .text("use_tracking", use_tracking.to_string());

        let response = self
            .client
            .post(self.url("analyze_frame")?)
            .multipart(form)
            .send()
            .await?;
        let analysis: FrameAnalysis = Self::decode(response).await?;
        debug!(head_count = analysis.head_count, names = ?analysis.names, "frame analysed");
        Ok(analysis)
    }

    /// `GET /unknown_faces`
    pub async fn unknown_faces(&self) -> Result<UnknownFacesResponse, ClassroomError> {
        let response = self.client.get(self.url("unknown_faces")?).send().await?;
        Self::decode(response).await
    }

    /// `GET /face_image/{reid_num}`
    pub async fn face_image(&self, reid_num: u32) -> Result<FaceImageResponse, ClassroomError> {
        let response = self
            .client
            .get(self.url(&format!("face_image/{reid_num}"))?)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `POST /add_student`
    pub async fn add_student(
        &self,
        reid_num: u32,
        student_name: &str,
        student_id: Option<&str>,
    ) -> Result<SuccessResponse, ClassroomError> {
        let mut fields = vec![
            ("reid_num", reid_num.to_string()),
            ("student_name", student_name.trim().to_owned()),
        ];
        if let Some(id) = student_id.map(str::trim).filter(|id| !id.is_empty()) {
            fields.push(("student_id", id.to_owned()));
        }
        let response = self
            .client
            .post(self.url("add_student")?)
            .form(&fields)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `DELETE /remove_face/{reid_num}`
    pub async fn remove_face(&self, reid_num: u32) -> Result<SuccessResponse, ClassroomError> {
        let response = self
            .client
            .delete(self.url(&format!("remove_face/{reid_num}"))?)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `GET /roster`
    pub async fn roster(&self) -> Result<RosterResponse, ClassroomError> {
        let response = self.client.get(self.url("roster")?).send().await?;
        Self::decode(response).await
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<EngineStatus, ClassroomError> {
        let response = self.client.get(self.url("status")?).send().await?;
        Self::decode(response).await
    }
}

//! JSON error responses.
//!
//! Every handler failure becomes `{"code", "message", "detail"}`. `detail`
//! repeats `message` for clients that only read that key.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};
use ts_rs::TS;

use crate::face::{FaceError, InferenceError};
use crate::forms::FieldErrors;
use crate::tutor::TutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub enum ApiErrorCode {
    BadRequest,
    InvalidImage,
    ValidationFailed,
    NotFound,
    DatabaseUnavailable,
    UpstreamFailed,
    Internal,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest | ApiErrorCode::InvalidImage | ApiErrorCode::ValidationFailed => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::UpstreamFailed => StatusCode::BAD_GATEWAY,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiErrorBody {
    pub code: ApiErrorCode,
    pub message: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn database_unavailable() -> Self {
        Self::new(
            ApiErrorCode::DatabaseUnavailable,
            "Campus database is not configured",
        )
    }

    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            code: ApiErrorCode::ValidationFailed,
            message: "Validation failed".to_owned(),
            fields: Some(fields),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiErrorBody {
            code: self.code,
            detail: self.message.clone(),
            message: self.message,
            fields: self.fields,
        };
        (status, Json(body)).into_response()
    }
}

/// Log a data-layer failure and hide its details from the client.
pub fn db_error(context: &str, error: anyhow::Error) -> ApiError {
    error!(error = ?error, "{context} failed");
    ApiError::internal_error(format!("{context} failed"))
}

pub trait OptionNotFoundExt<T> {
    fn or_not_found(self, entity: &str, id: impl Display) -> Result<T, ApiError>;
}

impl<T> OptionNotFoundExt<T> for Option<T> {
    fn or_not_found(self, entity: &str, id: impl Display) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(format!("{entity} {id} not found")))
    }
}

impl From<FaceError> for ApiError {
    fn from(err: FaceError) -> Self {
        match err {
            FaceError::EmptyName
            | FaceError::SelfMerge
            | FaceError::MergeSourceMissing(_)
            | FaceError::MergeTargetMissing(_)
            | FaceError::Base64 => ApiError::bad_request(err.to_string()),
            FaceError::InvalidImage => ApiError::new(ApiErrorCode::InvalidImage, err.to_string()),
            FaceError::NotFound(_) | FaceError::ImageNotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            FaceError::Inference(inner) => {
                warn!(error = %inner, "face inference failed");
                let message = match inner {
                    InferenceError::NotConfigured => "Face detector is not configured".to_owned(),
                    other => format!("Error analyzing frame: {other}"),
                };
                ApiError::new(ApiErrorCode::UpstreamFailed, message)
            }
            FaceError::Store(inner) => db_error("Face storage", inner),
            FaceError::Io(inner) => {
                error!(error = %inner, "face image storage failed");
                ApiError::internal_error("Face image storage failed")
            }
        }
    }
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::EmptyTopic => ApiError::bad_request(err.to_string()),
            TutorError::UnknownThread(_) => ApiError::not_found(err.to_string()),
            other => {
                warn!(error = %other, "tutor request failed");
                ApiError::new(ApiErrorCode::UpstreamFailed, other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_errors_map_to_statuses() {
        assert_eq!(ApiError::from(FaceError::EmptyName).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(FaceError::InvalidImage).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(FaceError::NotFound(4)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(FaceError::Inference(InferenceError::NotConfigured)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(FaceError::Store(anyhow::anyhow!("down"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_helper_names_the_entity() {
        let err = None::<()>.or_not_found("Class", "abc").unwrap_err();
        assert_eq!(err.code, ApiErrorCode::NotFound);
        assert_eq!(err.message, "Class abc not found");
    }
}

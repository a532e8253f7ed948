//! Face-analysis endpoints used by the live classroom.
//!
//! Paths and response shapes are the ones the classroom client already speaks,
//! so these routes sit at the root rather than under `/api`.

use axum::extract::{Multipart, Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;

use crate::face::engine::{EngineStatus, UnknownFace};
use crate::face::registry::{DuplicatePair, FaceSummary};
use crate::face::{FaceError, FrameAnalysis};
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::{FormFields, parse_bool};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FacesResponse {
    pub faces: Vec<FaceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnknownFacesResponse {
    pub unknown_faces: Vec<UnknownFace>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FaceImageResponse {
    pub reid_num: u32,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RosterResponse {
    pub roster: Vec<FaceSummary>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DuplicatesResponse {
    pub duplicates: Vec<DuplicatePair>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct DuplicatesParams {
    pub threshold: Option<f32>,
}

/// `POST /analyze_frame` (multipart: `file`, optional `use_tracking`)
#[instrument(skip_all)]
pub async fn analyze_frame(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FrameAnalysis>, ApiError> {
    let mut frame: Option<Vec<u8>> = None;
    let mut use_tracking = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                frame = Some(bytes.to_vec());
            }
            Some("use_tracking") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                use_tracking = parse_bool(&value).ok_or_else(|| {
                    ApiError::bad_request("Invalid value for 'use_tracking'")
                })?;
            }
            _ => {}
        }
    }

    let frame = frame.ok_or_else(|| ApiError::bad_request("Missing form field 'file'"))?;
    let analysis = state.engine.analyze(&frame, use_tracking).await?;
    Ok(Json(analysis))
}

/// `POST /rename` (form: `reid_num`, `new_name`)
pub async fn rename(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<SuccessResponse>, ApiError> {
    let reid_num: u32 = form
        .parse("reid_num")
        .map_err(|_| ApiError::bad_request("Invalid ReID number"))?;
    let new_name = form.required("new_name")?;
    let name = state.engine.rename(reid_num, new_name).await?;
    Ok(SuccessResponse::ok(format!("Renamed ReID {reid_num} to {name}")))
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status().await)
}

/// `GET /faces`
pub async fn faces(State(state): State<AppState>) -> Json<FacesResponse> {
    Json(FacesResponse {
        faces: state.engine.all_faces().await,
    })
}

/// `GET /unknown_faces`
pub async fn unknown_faces(State(state): State<AppState>) -> Json<UnknownFacesResponse> {
    let unknown_faces = state.engine.unknown_faces().await;
    Json(UnknownFacesResponse {
        count: unknown_faces.len(),
        unknown_faces,
    })
}

/// `GET /face_image/{reid_num}`
pub async fn face_image(
    State(state): State<AppState>,
    Path(reid_num): Path<u32>,
) -> Result<Json<FaceImageResponse>, ApiError> {
    let image = state.engine.face_image(reid_num).await?;
    Ok(Json(FaceImageResponse { reid_num, image }))
}

/// `POST /add_student` (form: `reid_num`, `student_name`, optional `student_id`)
pub async fn add_student(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<SuccessResponse>, ApiError> {
    let reid_num: u32 = form
        .parse("reid_num")
        .map_err(|_| ApiError::bad_request("Invalid ReID number"))?;
    let student_name = form.required("student_name")?;
    let name = state.engine.add_student(reid_num, student_name).await?;
    if let Some(student_id) = form.text("student_id").filter(|s| !s.trim().is_empty()) {
        info!(reid_num, student_id, name = %name, "student identified");
    }
    Ok(SuccessResponse::ok(format!(
        "Successfully added {name} (ReID: {reid_num})"
    )))
}

/// `DELETE /remove_face/{reid_num}`
pub async fn remove_face(
    State(state): State<AppState>,
    Path(reid_num): Path<u32>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.engine.dismiss(reid_num).await.map_err(|e| match e {
        FaceError::NotFound(_) => ApiError::not_found(format!("ReID {reid_num} not found")),
        other => other.into(),
    })?;
    Ok(SuccessResponse::ok(format!(
        "Face ReID {reid_num} has been dismissed."
    )))
}

/// `POST /merge_reid` (form: `source_reid`, `target_reid`)
pub async fn merge_reid(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<SuccessResponse>, ApiError> {
    let source: u32 = form.parse("source_reid")?;
    let target: u32 = form.parse("target_reid")?;
    let message = state.engine.merge(source, target).await?;
    Ok(SuccessResponse::ok(message))
}

/// `GET /roster`
pub async fn roster(State(state): State<AppState>) -> Json<RosterResponse> {
    Json(RosterResponse {
        roster: state.engine.roster().await,
    })
}

/// `POST /reset_tracker`
pub async fn reset_tracker(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.engine.reset_tracker().await;
    SuccessResponse::ok("Tracker reset successfully")
}

/// `GET /duplicates?threshold=`
pub async fn duplicates(
    State(state): State<AppState>,
    Query(params): Query<DuplicatesParams>,
) -> Json<DuplicatesResponse> {
    let duplicates = state.engine.duplicates(params.threshold).await;
    Json(DuplicatesResponse {
        count: duplicates.len(),
        duplicates,
    })
}

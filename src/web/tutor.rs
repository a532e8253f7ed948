//! AI tutor endpoints.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use ts_rs::TS;

use crate::state::AppState;
use crate::tutor::TutorReply;
use crate::web::error::ApiError;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct ExplainRequest {
    pub topic: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateTestRequest {
    pub thread_id: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// `POST /explain`
pub async fn explain(
    State(state): State<AppState>,
    Json(body): Json<ExplainRequest>,
) -> Result<Json<TutorReply>, ApiError> {
    let reply = state.tutor.explain(&body.topic, body.thread_id).await?;
    Ok(Json(reply))
}

/// `POST /create_test`
pub async fn create_test(
    State(state): State<AppState>,
    Json(body): Json<CreateTestRequest>,
) -> Result<Json<TutorReply>, ApiError> {
    let reply = state
        .tutor
        .create_test(&body.thread_id, body.prompt.as_deref())
        .await?;
    Ok(Json(reply))
}

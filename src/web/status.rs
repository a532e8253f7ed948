//! Root, health, and service status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{trace, warn};
use ts_rs::TS;

use crate::data::health::{self, DbHealth};
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize, TS)]
#[ts(export)]
pub struct RootResponse {
    message: &'static str,
    version: &'static str,
    commit: &'static str,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<DbHealth>,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    face_detector: String,
    tutor: String,
    tutor_threads: usize,
    services: BTreeMap<String, ServiceInfo>,
}

/// `GET /`
pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "ATTENDEX face recognition API",
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
    })
}

/// Health check endpoint
///
/// Stays 200 when the database probe fails so that the face routes, which
/// work without it, are not taken out of rotation; the failure is reported
/// through the `database` status instead.
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    trace!("health check requested");
    let database = match &state.db_pool {
        Some(pool) => match health::check(pool).await {
            Ok(db) => {
                state
                    .service_statuses
                    .set("database", ServiceStatus::Connected);
                Some(db)
            }
            Err(e) => {
                warn!(error = ?e, "database health check failed");
                state.service_statuses.set("database", ServiceStatus::Error);
                None
            }
        },
        None => None,
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
    })
}

/// Status endpoint showing every self-reported service
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut services = BTreeMap::new();

    for (name, svc_status) in state.service_statuses.all() {
        services.insert(
            name.clone(),
            ServiceInfo {
                name,
                status: svc_status,
            },
        );
    }

    let overall_status = if services
        .values()
        .any(|s| matches!(s.status, ServiceStatus::Error))
    {
        ServiceStatus::Error
    } else if services.is_empty() {
        ServiceStatus::Disabled
    } else {
        ServiceStatus::Active
    };

    let engine = state.engine.status().await;

    Json(StatusResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        face_detector: engine.face_detector,
        tutor: state.tutor.describe(),
        tutor_threads: state.tutor.thread_count(),
        services,
    })
}

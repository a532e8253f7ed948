//! Campus data routes under `/api`: courses, classes, attendance, reports.
//!
//! Every handler needs the database; without `DATABASE_URL` they answer 503.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::attendance::RosterEntry;
use crate::data::attendance::{self, RecordOutcome};
use crate::data::models::{
    AttendanceRecord, AttendanceSession, ClassAttendanceReport, ClassSummary, Course, ManualMark,
    Notification, Quiz, RosterStudent, TimetableSlot,
};
use crate::data::{classes, courses, notifications, quizzes, reports, timetable};
use crate::state::AppState;
use crate::web::error::{ApiError, OptionNotFoundExt, db_error};

const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;
const MAX_NOTIFICATION_LIMIT: i64 = 200;

fn pool(state: &AppState) -> Result<&PgPool, ApiError> {
    state.db_pool.as_ref().ok_or_else(ApiError::database_unavailable)
}

#[derive(Debug, Deserialize)]
pub struct CourseParams {
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassParams {
    #[serde(alias = "teacher_id")]
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StartSessionRequest {
    pub teacher_id: Uuid,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub ai_enabled: bool,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct ReconcileRequest {
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ManualRequest {
    pub marked_by: Uuid,
    #[serde(default)]
    pub marks: Vec<ManualMark>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub threshold: Option<f64>,
    #[serde(alias = "teacher_id")]
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AttendanceReportResponse {
    pub threshold: f64,
    pub classes: Vec<ClassAttendanceReport>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    #[ts(type = "number")]
    pub unread: i64,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionDetail {
    pub session: AttendanceSession,
    pub records: Vec<AttendanceRecord>,
}

/// `GET /api/courses?department=`
pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseParams>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let rows = courses::list_active(pool(&state)?, params.department.as_deref())
        .await
        .map_err(|e| db_error("Course listing", e))?;
    Ok(Json(rows))
}

/// `GET /api/courses/{id}`
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Course>, ApiError> {
    let course = courses::get_by_id(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Course lookup", e))?
        .or_not_found("Course", id)?;
    Ok(Json(course))
}

/// `GET /api/courses/{id}/quizzes`
pub async fn course_quizzes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Quiz>>, ApiError> {
    let rows = quizzes::list_published(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Quiz listing", e))?;
    Ok(Json(rows))
}

/// `GET /api/classes?teacherId=`
pub async fn list_classes(
    State(state): State<AppState>,
    Query(params): Query<ClassParams>,
) -> Result<Json<Vec<ClassSummary>>, ApiError> {
    let rows = classes::list(pool(&state)?, params.teacher_id)
        .await
        .map_err(|e| db_error("Class listing", e))?;
    Ok(Json(rows))
}

/// `GET /api/classes/{id}/roster`
pub async fn class_roster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RosterStudent>>, ApiError> {
    let pool = pool(&state)?;
    classes::get(pool, id)
        .await
        .map_err(|e| db_error("Class lookup", e))?
        .or_not_found("Class", id)?;
    let rows = classes::roster(pool, id)
        .await
        .map_err(|e| db_error("Class roster", e))?;
    Ok(Json(rows))
}

/// `GET /api/classes/{id}/timetable`
pub async fn class_timetable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimetableSlot>>, ApiError> {
    let rows = timetable::list_for_class(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Timetable listing", e))?;
    Ok(Json(rows))
}

/// `GET /api/classes/{id}/sessions`
pub async fn class_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceSession>>, ApiError> {
    let rows = attendance::list_sessions(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Session listing", e))?;
    Ok(Json(rows))
}

/// `POST /api/classes/{id}/sessions`
pub async fn start_session(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
    Json(body): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<AttendanceSession>), ApiError> {
    let pool = pool(&state)?;
    classes::get(pool, class_id)
        .await
        .map_err(|e| db_error("Class lookup", e))?
        .or_not_found("Class", class_id)?;

    let topic = body.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let session = attendance::start_session(pool, class_id, body.teacher_id, topic, body.ai_enabled)
        .await
        .map_err(|e| db_error("Session start", e))?;
    info!(session_id = %session.id, class_id = %class_id, "attendance session started");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/sessions/{id}`
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, ApiError> {
    let pool = pool(&state)?;
    let session = attendance::get_session(pool, id)
        .await
        .map_err(|e| db_error("Session lookup", e))?
        .or_not_found("Session", id)?;
    let records = attendance::list_records(pool, id)
        .await
        .map_err(|e| db_error("Record listing", e))?;
    Ok(Json(SessionDetail { session, records }))
}

/// `POST /api/sessions/{id}/end`
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceSession>, ApiError> {
    let session = attendance::end_session(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Session end", e))?
        .or_not_found("Session", id)?;
    info!(session_id = %id, "attendance session ended");
    Ok(Json(session))
}

/// Load a session together with the students enrolled in its class.
async fn session_students(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<(AttendanceSession, Vec<RosterStudent>), ApiError> {
    let session = attendance::get_session(pool, session_id)
        .await
        .map_err(|e| db_error("Session lookup", e))?
        .or_not_found("Session", session_id)?;
    let students = classes::roster(pool, session.class_id)
        .await
        .map_err(|e| db_error("Class roster", e))?;
    Ok((session, students))
}

/// `POST /api/sessions/{id}/reconcile`
///
/// Stores a live-classroom roster. Names that match no enrolled student are
/// reported back in `unmatched` rather than rejected.
pub async fn reconcile_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReconcileRequest>,
) -> Result<Json<RecordOutcome>, ApiError> {
    let pool = pool(&state)?;
    let (_, students) = session_students(pool, id).await?;
    let outcome = attendance::record_reconciliation(pool, id, &students, &body.roster)
        .await
        .map_err(|e| db_error("Attendance recording", e))?;
    info!(
        session_id = %id,
        recorded = outcome.recorded,
        unmatched = outcome.unmatched.len(),
        "live attendance recorded"
    );
    Ok(Json(outcome))
}

/// `POST /api/sessions/{id}/manual`
pub async fn manual_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ManualRequest>,
) -> Result<Json<RecordOutcome>, ApiError> {
    let pool = pool(&state)?;
    let (_, students) = session_students(pool, id).await?;
    let outcome = attendance::submit_manual(pool, id, body.marked_by, &students, &body.marks)
        .await
        .map_err(|e| db_error("Manual attendance", e))?;
    info!(session_id = %id, recorded = outcome.recorded, "manual attendance recorded");
    Ok(Json(outcome))
}

/// `GET /api/reports/attendance?threshold=&teacherId=`
pub async fn attendance_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Json<AttendanceReportResponse>, ApiError> {
    let threshold = params
        .threshold
        .unwrap_or(reports::DEFAULT_LOW_ATTENDANCE_THRESHOLD);
    if !(0.0..=100.0).contains(&threshold) {
        return Err(ApiError::bad_request("Threshold must be between 0 and 100"));
    }
    let classes = reports::attendance_by_class(pool(&state)?, threshold, params.teacher_id)
        .await
        .map_err(|e| db_error("Attendance report", e))?;
    Ok(Json(AttendanceReportResponse { threshold, classes }))
}

/// `GET /api/users/{id}/notifications?limit=`
pub async fn user_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let pool = pool(&state)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .clamp(1, MAX_NOTIFICATION_LIMIT);
    let notifications = notifications::list_for_user(pool, user_id, limit)
        .await
        .map_err(|e| db_error("Notification listing", e))?;
    let unread = notifications::unread_count(pool, user_id)
        .await
        .map_err(|e| db_error("Unread count", e))?;
    Ok(Json(NotificationsResponse {
        notifications,
        unread,
    }))
}

/// `POST /api/notifications/{id}/read`
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let updated = notifications::mark_read(pool(&state)?, id)
        .await
        .map_err(|e| db_error("Notification update", e))?;
    if !updated {
        return Err(ApiError::not_found(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

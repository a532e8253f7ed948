//! Web API router construction.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use std::time::Duration;

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{auth, campus, faces, status, tutor, ws};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};

/// Camera frames are posted whole.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates the web server router
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    // Face-analysis routes keep the paths the classroom client already uses.
    let face_router = Router::new()
        .route("/analyze_frame", post(faces::analyze_frame))
        .route("/rename", post(faces::rename))
        .route("/status", get(faces::status))
        .route("/faces", get(faces::faces))
        .route("/unknown_faces", get(faces::unknown_faces))
        .route("/face_image/{reid_num}", get(faces::face_image))
        .route("/add_student", post(faces::add_student))
        .route("/remove_face/{reid_num}", delete(faces::remove_face))
        .route("/merge_reid", post(faces::merge_reid))
        .route("/roster", get(faces::roster))
        .route("/reset_tracker", post(faces::reset_tracker))
        .route("/duplicates", get(faces::duplicates))
        .route("/explain", post(tutor::explain))
        .route("/create_test", post(tutor::create_test))
        .layer(DefaultBodyLimit::max(MAX_FRAME_BYTES))
        .with_state(app_state.clone());

    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/auth/validate/sign-in", post(auth::validate_sign_in))
        .route("/auth/validate/sign-up", post(auth::validate_sign_up))
        .route("/navigation", get(auth::navigation))
        .route("/courses", get(campus::list_courses))
        .route("/courses/{id}", get(campus::get_course))
        .route("/courses/{id}/quizzes", get(campus::course_quizzes))
        .route("/classes", get(campus::list_classes))
        .route("/classes/{id}/roster", get(campus::class_roster))
        .route("/classes/{id}/timetable", get(campus::class_timetable))
        .route(
            "/classes/{id}/sessions",
            get(campus::class_sessions).post(campus::start_session),
        )
        .route("/sessions/{id}", get(campus::get_session))
        .route("/sessions/{id}/end", post(campus::end_session))
        .route("/sessions/{id}/reconcile", post(campus::reconcile_session))
        .route("/sessions/{id}/manual", post(campus::manual_attendance))
        .route("/reports/attendance", get(campus::attendance_report))
        .route(
            "/users/{id}/notifications",
            get(campus::user_notifications),
        )
        .route(
            "/notifications/{id}/read",
            post(campus::mark_notification_read),
        )
        .with_state(app_state.clone());

    // The socket lives outside the timeout layer; it is meant to stay open.
    let socket_router = Router::new()
        .route("/ws/analyze", get(ws::analyze_ws))
        .with_state(app_state.clone());

    let router = Router::new()
        .route("/", get(status::root))
        .route("/health", get(status::health))
        .merge(face_router)
        .nest("/api", api_router)
        .layer((
            CompressionLayer::new()
                .zstd(true)
                .br(true)
                .gzip(true)
                .quality(tower_http::CompressionLevel::Fastest),
            TimeoutLayer::new(request_timeout),
        ))
        .with_state(app_state)
        .merge(socket_router);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        // The web client is served from another origin.
        CorsLayer::permissive(),
    ))
}

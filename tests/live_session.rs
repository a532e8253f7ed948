//! A live classroom driven by real engine output.

mod helpers;

use attendex::attendance::{AttendanceStatus, LiveSession};
use chrono::Utc;
use helpers::{JPEG_FRAME, face, test_app};

#[tokio::test]
async fn recognised_faces_update_the_class_roster() {
    let app = test_app().await;
    let engine = app.state.engine.clone();
    app.detector.set_faces(vec![face(10, 0), face(120, 1), face(240, 2)]);
    engine.analyze(JPEG_FRAME, false).await.unwrap();
    engine.add_student(1, "Ana Ruiz").await.unwrap();
    engine.add_student(2, "ben ito").await.unwrap();

    let now = Utc::now();
    let mut session = LiveSession::from_names(["Ana Ruiz", "Ben Ito", "Chidi Okafor"], now);

    let analysis = engine.analyze(JPEG_FRAME, false).await.unwrap();
    let result = session.apply(1, &analysis, now).unwrap();

    // The third face is still Unknown_3 and never joins the roster.
    assert_eq!(result.present, vec!["Ana Ruiz", "Ben Ito"]);
    assert_eq!(result.absent, vec!["Chidi Okafor"]);
    assert!(result.added.is_empty());
    assert_eq!(session.roster().len(), 3);
    assert_eq!(session.attendance_rate(), 67);
    assert_eq!(session.roster()[0].confidence, 93);

    // The third face turns out to be a student from another section.
    engine.add_student(3, "Dana Levi").await.unwrap();
    let analysis = engine.analyze(JPEG_FRAME, false).await.unwrap();
    let result = session.apply(2, &analysis, now).unwrap();
    assert_eq!(result.added, vec!["Dana Levi"]);
    assert_eq!(session.roster().last().unwrap().id, 4);
    assert_eq!(session.roster()[2].status, AttendanceStatus::Absent);
}

#[tokio::test]
async fn older_results_never_overwrite_newer_ones() {
    let app = test_app().await;
    let engine = app.state.engine.clone();
    app.detector.set_faces(vec![face(10, 0)]);
    engine.analyze(JPEG_FRAME, false).await.unwrap();
    engine.add_student(1, "Ana Ruiz").await.unwrap();

    let now = Utc::now();
    let mut session = LiveSession::from_names(["Ana Ruiz"], now);

    let seen = engine.analyze(JPEG_FRAME, false).await.unwrap();
    app.detector.set_faces(Vec::new());
    let empty = engine.analyze(JPEG_FRAME, false).await.unwrap();

    // Request 2 (empty room) finishes first, then the slower request 1 arrives.
    session.apply(2, &empty, now).unwrap();
    assert!(session.apply(1, &seen, now).is_none());
    assert_eq!(session.roster()[0].status, AttendanceStatus::Absent);
    assert_eq!(session.last_applied(), Some(2));
    assert_eq!(session.stats().total_detections, 0);
}

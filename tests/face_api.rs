//! Router-level tests for the face-analysis endpoints.

mod helpers;

use axum::http::StatusCode;
use helpers::{JPEG_FRAME, face, get, json_body, post_form, post_frame, test_app};
use tower::ServiceExt;

#[tokio::test]
async fn root_reports_name_and_version() {
    let app = test_app().await;
    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["message"].as_str().unwrap().contains("ATTENDEX"));
}

#[tokio::test]
async fn unseen_face_is_enrolled_as_unknown() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0)]);

    let response = app
        .router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(false)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["head_count"], 1);
    assert_eq!(body["names"], serde_json::json!(["Unknown_1"]));
    assert_eq!(body["face_info"][0]["status"], "unknown");
    assert_eq!(body["face_info"][0]["reid_num"], 1);
    assert_eq!(body["tracking_enabled"], false);
    assert!(body["image"].is_string());

    let body = json_body(app.router.clone().oneshot(get("/unknown_faces")).await.unwrap()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["unknown_faces"][0]["reid_num"], 1);
    assert_eq!(body["unknown_faces"][0]["has_image"], true);

    let body = json_body(app.router.clone().oneshot(get("/face_image/1")).await.unwrap()).await;
    assert_eq!(body["reid_num"], 1);
    assert!(!body["image"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn added_student_is_recognised_on_the_next_frame() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0)]);
    app.router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(false)))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post_form(
            "/add_student",
            "reid_num=1&student_name=Ana+Ruiz&student_id=S-104",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully added Ana Ruiz (ReID: 1)");

    let body = json_body(
        app.router
            .clone()
            .oneshot(post_frame(JPEG_FRAME, None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["names"], serde_json::json!(["Ana Ruiz"]));
    assert_eq!(body["face_info"][0]["status"], "recognized");
    assert_eq!(body["tracking_enabled"], true);

    let body = json_body(app.router.clone().oneshot(get("/roster")).await.unwrap()).await;
    assert_eq!(body["roster"][0]["name"], "Ana Ruiz");

    let body = json_body(app.router.clone().oneshot(get("/unknown_faces")).await.unwrap()).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn dismissing_unknown_faces() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0), face(120, 1)]);
    app.router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(false)))
        .await
        .unwrap();

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri("/remove_face/2")
        .body(axum::body::Body::empty())
        .unwrap();
    let body = json_body(app.router.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(body["message"], "Face ReID 2 has been dismissed.");

    let body = json_body(app.router.clone().oneshot(get("/unknown_faces")).await.unwrap()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["unknown_faces"][0]["reid_num"], 1);

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri("/remove_face/99")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "ReID 99 not found");

    // A dismissed face still matches but is reported as recognised.
    app.detector.set_faces(vec![face(120, 1)]);
    let body = json_body(
        app.router
            .clone()
            .oneshot(post_frame(JPEG_FRAME, Some(false)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["face_info"][0]["name"], "Dismissed_2");
    assert_eq!(body["face_info"][0]["status"], "recognized");
}

#[tokio::test]
async fn merge_rejects_self_and_missing_ids() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0), face(120, 1)]);
    app.router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(false)))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post_form("/merge_reid", "source_reid=1&target_reid=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(post_form("/merge_reid", "source_reid=7&target_reid=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(post_form("/merge_reid", "source_reid=2&target_reid=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Merged ReID 2 into 1");

    let body = json_body(app.router.clone().oneshot(get("/faces")).await.unwrap()).await;
    let names: Vec<&str> = body["faces"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Merged_to_1"));
}

#[tokio::test]
async fn rejects_frames_that_are_not_images() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(post_frame(b"plain text", Some(true)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "InvalidImage");
}

#[tokio::test]
async fn rename_requires_a_name() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0)]);
    app.router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(false)))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post_form("/rename", "reid_num=1&new_name=+++"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(post_form("/rename", "reid_num=abc&new_name=Ana"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid ReID number");
}

#[tokio::test]
async fn status_and_tracker_reset() {
    let app = test_app().await;
    app.detector.set_faces(vec![face(10, 0)]);
    app.router
        .clone()
        .oneshot(post_frame(JPEG_FRAME, Some(true)))
        .await
        .unwrap();

    let body = json_body(app.router.clone().oneshot(get("/status")).await.unwrap()).await;
    assert_eq!(body["known_faces_in_session"], 1);
    assert_eq!(body["total_reid_database"], 1);
    assert_eq!(body["frames_processed"], 1);
    assert_eq!(body["face_detector"], "scripted");

    let response = app
        .router
        .clone()
        .oneshot(post_form("/reset_tracker", ""))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["message"], "Tracker reset successfully");

    let body = json_body(app.router.clone().oneshot(get("/status")).await.unwrap()).await;
    assert_eq!(body["known_faces_in_session"], 0);
    assert_eq!(body["total_reid_database"], 1);
}

#[tokio::test]
async fn missing_face_image_is_not_found() {
    let app = test_app().await;
    let response = app.router.clone().oneshot(get("/face_image/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "Face image not found");
}

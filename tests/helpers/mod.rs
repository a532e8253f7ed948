//! Shared fixtures: a scripted detector, in-memory state and request helpers.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use attendex::face::embedding::Embedding;
use attendex::face::geometry::BBox;
use attendex::face::{
    Detection, EngineConfig, FaceDetector, FaceEngine, FaceImages, InferenceError,
    MemoryFaceStore,
};
use attendex::state::AppState;
use attendex::tutor::{ChatBackend, ChatMessage, Tutor, TutorError};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use serde_json::Value;

/// Smallest byte string that passes the JPEG sniff.
pub const JPEG_FRAME: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];
pub const FACE_CROP: &[u8] = &[0xFF, 0xD8, 0xFF, 0xDB, 0x01, 0x02, 0xFF, 0xD9];

const BOUNDARY: &str = "attendex-test-boundary";

/// Returns whatever faces it was last given, for every frame.
#[derive(Default)]
pub struct ScriptedDetector {
    faces: Mutex<Vec<Detection>>,
}

impl ScriptedDetector {
    pub fn set_faces(&self, faces: Vec<Detection>) {
        *self.faces.lock().unwrap() = faces;
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn detect(&self, _frame: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        Ok(self.faces.lock().unwrap().clone())
    }

    fn describe(&self) -> String {
        "scripted".to_owned()
    }
}

/// A face at `x` whose embedding points along axis `axis`.
pub fn face(x: i32, axis: usize) -> Detection {
    let mut values = vec![0.0_f32; 8];
    values[axis] = 1.0;
    Detection {
        bbox: BBox::from([x, 10, x + 40, 60]),
        confidence: 0.93,
        embedding: Some(Embedding::new(values)),
        crop: Some(FACE_CROP.to_vec()),
    }
}

/// Replies to every prompt with the same JSON.
pub struct CannedChat(pub String);

#[async_trait]
impl ChatBackend for CannedChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, TutorError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "canned".to_owned()
    }
}

pub fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("attendex-{label}-{}", ulid::Ulid::new()))
}

pub struct TestApp {
    pub router: Router,
    pub detector: Arc<ScriptedDetector>,
    pub state: AppState,
    pub face_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.face_dir);
    }
}

/// Router over in-memory storage, a scripted detector and a canned tutor.
pub async fn test_app() -> TestApp {
    let detector = Arc::new(ScriptedDetector::default());
    let face_dir = temp_dir("faces");
    let engine = FaceEngine::load(
        EngineConfig::default(),
        Arc::new(MemoryFaceStore::new()),
        detector.clone(),
        FaceImages::new(&face_dir),
    )
    .await
    .unwrap();
    let tutor = Tutor::new(Arc::new(CannedChat(
        r#"```json
{"explanation": "Photosynthesis turns light into sugar.", "examples": [], "understanding_check": "Shall I quiz you?"}
```"#
            .to_owned(),
    )));
    let state = AppState::new(Arc::new(engine), Arc::new(tutor), None);
    let router = attendex::web::create_router(state.clone(), Duration::from_secs(10));
    TestApp {
        router,
        detector,
        state,
        face_dir,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

/// A multipart frame upload the way a browser `FormData` sends it.
pub fn post_frame(frame: &[u8], use_tracking: Option<bool>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"frame.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(frame);
    body.extend_from_slice(b"\r\n");
    if let Some(flag) = use_tracking {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"use_tracking\"\r\n\r\n{flag}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze_frame")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

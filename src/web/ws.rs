//! `/ws/analyze`: frame analysis over a long-lived WebSocket.
//!
//! Each text message carries one base64 frame. Per-frame failures are sent
//! back as `{"error": ...}` and the socket stays open; a malformed message or
//! a transport failure closes it with 1011.

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::face::{FaceError, image};
use crate::state::AppState;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeMessage {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub use_tracking: bool,
}

#[derive(Debug, Serialize)]
pub struct SocketError {
    pub error: String,
}

impl SocketError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// User-facing text for a failed frame.
    pub fn for_face_error(err: &FaceError) -> Self {
        match err {
            FaceError::Base64 => Self::new("Base64 decoding failed."),
            FaceError::InvalidImage => Self::new("Invalid image data."),
            other => Self::new(format!("An unexpected error occurred: {other}")),
        }
    }
}

/// `GET /ws/analyze`
pub async fn analyze_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("websocket client connected");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "websocket receive failed");
                break;
            }
        };

        let request: AnalyzeMessage = match serde_json::from_str(text.as_str()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "malformed websocket message");
                close_with_error(&mut socket).await;
                return;
            }
        };

        let reply = match analyze_message(&state, request).await {
            Ok(analysis) => serde_json::to_string(&analysis),
            Err(err) => serde_json::to_string(&err),
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "failed to serialize websocket reply");
                close_with_error(&mut socket).await;
                return;
            }
        };

        if socket.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
    }

    info!("websocket client disconnected");
}

async fn analyze_message(
    state: &AppState,
    request: AnalyzeMessage,
) -> Result<crate::face::FrameAnalysis, SocketError> {
    let Some(data) = request.image.filter(|s| !s.is_empty()) else {
        return Err(SocketError::new("No image data provided."));
    };

    let frame = image::decode(&data).map_err(|e| {
        debug!(error = %e, "websocket frame decode failed");
        SocketError::for_face_error(&e)
    })?;

    state
        .engine
        .analyze(&frame, request.use_tracking)
        .await
        .map_err(|e| {
            warn!(error = %e, "websocket frame analysis failed");
            SocketError::for_face_error(&e)
        })
}

async fn close_with_error(socket: &mut WebSocket) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: "Server error".into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "failed to send websocket close frame");
    }
}

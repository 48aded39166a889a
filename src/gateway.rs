//! HTTP gateway: the single `/process-voice` endpoint plus CORS.
//!
//! The caller always receives either a complete success payload or a JSON
//! object with an `error` field — never a partial success body, and never
//! internal detail.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::errors::{PipelineError, TranscribeError};
use crate::pipeline::VoicePipeline;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<VoicePipeline>,
}

#[derive(Debug, Deserialize)]
struct ProcessVoiceRequest {
    session_id: Option<String>,
    /// Base64-encoded audio bytes.
    audio_data: Option<String>,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/process-voice", post(process_voice))
        .layer(cors)
        .with_state(state)
}

/// `POST /process-voice` handler.
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// that malformed payloads still get a JSON `{"error": ...}` body.
async fn process_voice(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ProcessVoiceRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid request body"),
    };

    let audio_b64 = match request.audio_data {
        Some(s) if !s.is_empty() => s,
        _ => return error_response(StatusCode::BAD_REQUEST, "No audio data provided"),
    };

    let audio = match base64::engine::general_purpose::STANDARD.decode(audio_b64) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid audio data encoding"),
    };

    match state.pipeline.process_turn(request.session_id, audio).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(PipelineError::EmptyAudio) => {
            error_response(StatusCode::BAD_REQUEST, "No audio data provided")
        }
        Err(PipelineError::Transcribe(e)) => {
            warn!("Transcription failed: {}", e);
            let message = match e {
                TranscribeError::Timeout { .. } => "Transcription timed out",
                _ => "Transcription failed",
            };
            error_response(StatusCode::BAD_GATEWAY, message)
        }
        Err(PipelineError::Other(e)) => {
            error!("Voice pipeline failed: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// JSON error body. The router-level CORS layer stamps
/// `Access-Control-Allow-Origin: *` on these the same as on successes.
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

//! End-to-end tests for the /process-voice gateway, with all four external
//! services replaced by in-memory fakes. The turn store runs against a real
//! SQLite file in a temp directory.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use voicebot::advisor::{Advisor, FALLBACK_RESPONSE};
use voicebot::config::schema::TranscriptionConfig;
use voicebot::gateway::{router, AppState};
use voicebot::pipeline::VoicePipeline;
use voicebot::providers::base::{ChatProvider, ChatResponse};
use voicebot::services::blob::BlobStore;
use voicebot::services::speech::SpeechSynthesizer;
use voicebot::services::transcription::{JobStatus, TranscriptionApi};
use voicebot::store::turns::TurnStore;
use voicebot::transcribe::TranscriptionWaiter;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "https://media.test/{}?sig=stub&expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    fn object_uri(&self, key: &str) -> String {
        format!("mem://{}", key)
    }
}

/// Transcription fake: each job completes immediately and yields the next
/// scripted transcript. `fail_jobs` / `never_finish` flip the terminal state.
struct FakeTranscription {
    transcripts: Mutex<VecDeque<String>>,
    fail_jobs: bool,
    never_finish: bool,
}

impl FakeTranscription {
    fn with_transcripts(transcripts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            transcripts: Mutex::new(transcripts.iter().map(|s| s.to_string()).collect()),
            fail_jobs: false,
            never_finish: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            transcripts: Mutex::new(VecDeque::new()),
            fail_jobs: true,
            never_finish: false,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            transcripts: Mutex::new(VecDeque::new()),
            fail_jobs: false,
            never_finish: true,
        })
    }
}

#[async_trait]
impl TranscriptionApi for FakeTranscription {
    async fn start_job(&self, _media_uri: &str) -> Result<String> {
        Ok("job-1".to_string())
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatus> {
        if self.never_finish {
            return Ok(JobStatus::InProgress);
        }
        if self.fail_jobs {
            return Ok(JobStatus::Failed {
                reason: "media unreadable".into(),
            });
        }
        Ok(JobStatus::Completed {
            transcript_uri: "mem://transcripts/next".into(),
        })
    }

    async fn fetch_transcript(&self, _transcript_uri: &str) -> Result<String> {
        Ok(self
            .transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "unscripted transcript".to_string()))
    }
}

/// Chat provider fake that captures every user prompt and replays canned
/// replies; `fail` makes every call error.
struct CapturingProvider {
    prompts: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<String>>,
    fail: bool,
}

impl CapturingProvider {
    fn with_replies(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl ChatProvider for CapturingProvider {
    async fn chat(&self, _system: &str, user: &str, _max_tokens: u32) -> Result<ChatResponse> {
        self.prompts.lock().unwrap().push(user.to_string());
        if self.fail {
            anyhow::bail!("generation service unavailable");
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "canned advice".to_string());
        Ok(ChatResponse {
            content: Some(reply),
        })
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}

struct FakeSynthesizer {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        if self.fail {
            anyhow::bail!("synthesis backend unavailable");
        }
        Ok(b"fake mp3 bytes".to_vec())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    app: Router,
    blobs: Arc<FakeBlobStore>,
    provider: Arc<CapturingProvider>,
    _dir: tempfile::TempDir,
}

fn harness(transcription: Arc<FakeTranscription>, provider: Arc<CapturingProvider>) -> Harness {
    harness_with_synthesizer(transcription, provider, Arc::new(FakeSynthesizer { fail: false }))
}

fn harness_with_synthesizer(
    transcription: Arc<FakeTranscription>,
    provider: Arc<CapturingProvider>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TurnStore::new(&dir.path().join("turns.db")).unwrap());
    let blobs = Arc::new(FakeBlobStore::default());

    let waiter = TranscriptionWaiter::new(
        transcription,
        &TranscriptionConfig {
            poll_interval_ms: 1,
            max_attempts: 3,
            ..Default::default()
        },
    );

    let pipeline = Arc::new(VoicePipeline::new(
        blobs.clone(),
        waiter,
        Advisor::new(provider.clone()),
        synthesizer,
        store,
    ));

    Harness {
        app: router(AppState { pipeline }),
        blobs,
        provider,
        _dir: dir,
    }
}

fn audio_b64() -> String {
    base64::engine::general_purpose::STANDARD.encode(b"RIFF fake wav bytes")
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Value, Option<String>) {
    let request = Request::builder()
        .method("POST")
        .uri("/process-voice")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://app.example.dev")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let parsed = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, parsed, allow_origin)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_request_returns_complete_payload() {
    let h = harness(
        FakeTranscription::with_transcripts(&["help me design an API"]),
        CapturingProvider::with_replies(&["Start with the resource model."]),
    );

    let (status, body, allow_origin) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(allow_origin.as_deref(), Some("*"));
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["user_input"], "help me design an API");
    assert_eq!(body["ai_response"], "Start with the resource model.");
    let url = body["audio_url"].as_str().unwrap();
    assert!(url.contains("output/s1/"));
    assert!(url.contains("expires=300"));
}

#[tokio::test]
async fn stores_input_and_output_artifacts() {
    let h = harness(
        FakeTranscription::with_transcripts(&["hello"]),
        CapturingProvider::with_replies(&["hi"]),
    );

    let (status, _, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let objects = h.blobs.objects.lock().unwrap();
    let input = objects
        .iter()
        .find(|(k, _)| k.starts_with("input/s1/") && k.ends_with(".wav"))
        .expect("input artifact stored");
    assert_eq!(input.1 .1, "audio/wav");
    let output = objects
        .iter()
        .find(|(k, _)| k.starts_with("output/s1/") && k.ends_with(".mp3"))
        .expect("output artifact stored");
    assert_eq!(output.1 .1, "audio/mpeg");
}

#[tokio::test]
async fn missing_audio_data_is_rejected_with_400() {
    let h = harness(
        FakeTranscription::with_transcripts(&[]),
        CapturingProvider::with_replies(&[]),
    );

    let (status, body, allow_origin) = post_json(&h.app, json!({"session_id": "s2"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(allow_origin.as_deref(), Some("*"));
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
    // No side effects before the rejection.
    assert!(h.blobs.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_base64_is_rejected_with_400() {
    let h = harness(
        FakeTranscription::with_transcripts(&[]),
        CapturingProvider::with_replies(&[]),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": "@@not-base64@@"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn malformed_json_body_still_gets_json_error() {
    let h = harness(
        FakeTranscription::with_transcripts(&[]),
        CapturingProvider::with_replies(&[]),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/process-voice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn generated_session_id_when_none_supplied() {
    let h = harness(
        FakeTranscription::with_transcripts(&["hello"]),
        CapturingProvider::with_replies(&["hi"]),
    );

    let (status, body, _) = post_json(&h.app, json!({"audio_data": audio_b64()})).await;

    assert_eq!(status, StatusCode::OK);
    let sid = body["session_id"].as_str().unwrap();
    assert!(!sid.is_empty());
}

#[tokio::test]
async fn empty_session_id_gets_generated_one() {
    let h = harness(
        FakeTranscription::with_transcripts(&["hello"]),
        CapturingProvider::with_replies(&["hi"]),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let sid = body["session_id"].as_str().unwrap();
    assert!(!sid.is_empty());
}

#[tokio::test]
async fn synthesis_failure_maps_to_generic_500() {
    let h = harness_with_synthesizer(
        FakeTranscription::with_transcripts(&["hello"]),
        CapturingProvider::with_replies(&["hi"]),
        Arc::new(FakeSynthesizer { fail: true }),
    );

    let (status, body, allow_origin) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(allow_origin.as_deref(), Some("*"));
}

#[tokio::test]
async fn second_turn_sees_first_turn_in_context() {
    let h = harness(
        FakeTranscription::with_transcripts(&[
            "I need help building a REST API",
            "what about versioning?",
        ]),
        CapturingProvider::with_replies(&["Define your resources first.", "Use the URL path."]),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "s1");

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "s1");

    let prompts = h.provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    // First turn had no history.
    assert!(!prompts[0].contains("REST API\nassistant"));
    // Second turn's prompt carries the first turn, transcript and reply both.
    assert!(prompts[1].contains("user: I need help building a REST API"));
    assert!(prompts[1].contains("assistant: Define your resources first."));
    assert!(prompts[1].contains("Current request: what about versioning?"));
}

#[tokio::test]
async fn generation_failure_still_returns_200_with_fallback() {
    let h = harness(
        FakeTranscription::with_transcripts(&["anything"]),
        CapturingProvider::failing(),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_response"], FALLBACK_RESPONSE);
    assert!(!body["ai_response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn failed_transcription_job_maps_to_502() {
    let h = harness(
        FakeTranscription::failing(),
        CapturingProvider::with_replies(&[]),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Transcription failed");
}

#[tokio::test]
async fn transcription_timeout_maps_to_502_with_distinct_message() {
    let h = harness(
        FakeTranscription::hanging(),
        CapturingProvider::with_replies(&[]),
    );

    let (status, body, _) = post_json(
        &h.app,
        json!({"session_id": "s1", "audio_data": audio_b64()}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Transcription timed out");
}

#[tokio::test]
async fn preflight_gets_cors_headers() {
    let h = harness(
        FakeTranscription::with_transcripts(&[]),
        CapturingProvider::with_replies(&[]),
    );

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/process-voice")
        .header(header::ORIGIN, "https://app.example.dev")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
}

//! Turn orchestrator: the fixed store → transcribe → contextualize →
//! advise → synthesize → persist → present sequence.
//!
//! All durable state lives in the turn store and blob service, so the
//! pipeline holds no per-request mutable state and can run with arbitrary
//! request concurrency. Each step's output feeds the next; nothing is
//! skipped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::context::build_context;
use crate::errors::PipelineError;
use crate::services::blob::BlobStore;
use crate::services::speech::SpeechSynthesizer;
use crate::store::turns::TurnStore;
use crate::transcribe::TranscriptionWaiter;

/// How many turns to fetch from the store; the context assembler caps
/// what it actually renders.
const HISTORY_FETCH_LIMIT: usize = 10;

/// Validity of the signed URL returned to the caller.
const PRESIGN_TTL: Duration = Duration::from_secs(300);

/// Result of one fully processed voice turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: String,
    pub user_input: String,
    pub ai_response: String,
    pub audio_url: String,
}

/// The voice turn pipeline with its external collaborators.
pub struct VoicePipeline {
    blobs: Arc<dyn BlobStore>,
    waiter: TranscriptionWaiter,
    advisor: Advisor,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: Arc<TurnStore>,
}

impl VoicePipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        waiter: TranscriptionWaiter,
        advisor: Advisor,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: Arc<TurnStore>,
    ) -> Self {
        Self {
            blobs,
            waiter,
            advisor,
            synthesizer,
            store,
        }
    }

    /// Process one voice turn.
    ///
    /// A caller-supplied session id is returned unchanged so the caller can
    /// continue the conversation; otherwise a fresh one is generated. Empty
    /// audio is rejected before any side effect occurs.
    pub async fn process_turn(
        &self,
        session_id: Option<String>,
        audio: Vec<u8>,
    ) -> Result<TurnOutcome, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }

        let session_id = session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info!("Processing voice turn for session {}", session_id);

        // 1. Store the input audio.
        let input_key = input_key(&session_id);
        self.blobs
            .put_object(&input_key, audio, "audio/wav")
            .await?;

        // 2. Transcribe it.
        let user_input = self
            .waiter
            .transcribe(&self.blobs.object_uri(&input_key))
            .await?;

        // 3. Assemble context from recent history.
        let history = self.store.recent(&session_id, HISTORY_FETCH_LIMIT);
        let context_block = build_context(&history);
        debug!(
            "Session {}: {} prior turns in context",
            session_id,
            history.len().min(crate::context::CONTEXT_TURNS)
        );

        // 4. Generate the advisor reply (infallible; falls back internally).
        let ai_response = self.advisor.advise(&user_input, &context_block).await;

        // 5. Synthesize and store the reply audio.
        let speech = self.synthesizer.synthesize(&ai_response).await?;
        let output_key = output_key(&session_id);
        self.blobs
            .put_object(&output_key, speech, "audio/mpeg")
            .await?;

        // 6. Persist the turn (text only, never audio).
        self.store
            .append(&session_id, &user_input, &ai_response)
            .map_err(PipelineError::Other)?;

        // 7. Hand back a time-limited reference to the reply audio.
        let audio_url = self.blobs.presign_get(&output_key, PRESIGN_TTL).await?;

        info!("Completed voice turn for session {}", session_id);
        Ok(TurnOutcome {
            session_id,
            user_input,
            ai_response,
            audio_url,
        })
    }
}

fn input_key(session_id: &str) -> String {
    format!("input/{}/{}.wav", session_id, Uuid::new_v4())
}

fn output_key(session_id: &str) -> String {
    format!("output/{}/{}.mp3", session_id, Uuid::new_v4())
}

//! Transcription waiter: submit a job, poll it to a terminal state.
//!
//! The wait is a fixed-interval, fixed-attempt-count loop — a deliberate
//! simplicity/latency trade-off. The one property it must preserve is that
//! the caller never waits unboundedly: every path ends in a transcript,
//! a [`TranscribeError::JobFailed`], or a [`TranscribeError::Timeout`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::schema::TranscriptionConfig;
use crate::errors::TranscribeError;
use crate::services::transcription::{JobStatus, TranscriptionApi};

/// Bounded polling wait over a [`TranscriptionApi`].
pub struct TranscriptionWaiter {
    api: Arc<dyn TranscriptionApi>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl TranscriptionWaiter {
    pub fn new(api: Arc<dyn TranscriptionApi>, config: &TranscriptionConfig) -> Self {
        Self {
            api,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts,
        }
    }

    /// Transcribe the audio at `media_uri`.
    ///
    /// Submits a job, then polls up to `max_attempts` times with a fixed
    /// sleep between polls. On completion the transcript is fetched from
    /// the job's result location — never inferred from the status document.
    pub async fn transcribe(&self, media_uri: &str) -> Result<String, TranscribeError> {
        let job_id = self
            .api
            .start_job(media_uri)
            .await
            .map_err(|e| TranscribeError::Api(format!("{:#}", e)))?;

        for attempt in 1..=self.max_attempts {
            match self
                .api
                .job_status(&job_id)
                .await
                .map_err(|e| TranscribeError::Api(format!("{:#}", e)))?
            {
                JobStatus::Completed { transcript_uri } => {
                    debug!("Job {} completed on attempt {}", job_id, attempt);
                    let text = self
                        .api
                        .fetch_transcript(&transcript_uri)
                        .await
                        .map_err(|e| TranscribeError::Api(format!("{:#}", e)))?;
                    info!("Transcribed {} chars from {}", text.len(), media_uri);
                    return Ok(text);
                }
                JobStatus::Failed { reason } => {
                    return Err(TranscribeError::JobFailed(reason));
                }
                JobStatus::InProgress => {
                    debug!("Job {} still in progress (attempt {})", job_id, attempt);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(TranscribeError::Timeout {
            attempts: self.max_attempts,
        })
    }
}

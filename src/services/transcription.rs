//! Async transcription service client.
//!
//! The service runs transcription as named jobs: submit a media URI, poll
//! the job until it reaches a terminal state, then fetch the transcript
//! document from the job's result location.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

use crate::config::schema::TranscriptionConfig;
use crate::services::body_snippet;

/// Observed state of a transcription job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed { transcript_uri: String },
    Failed { reason: String },
}

/// Narrow interface over the transcription service.
#[async_trait]
pub trait TranscriptionApi: Send + Sync {
    /// Submit a job for the audio at `media_uri`. Returns the job name.
    async fn start_job(&self, media_uri: &str) -> Result<String>;

    /// Fetch the current status of a job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatus>;

    /// Fetch and parse the transcript document at `transcript_uri`.
    async fn fetch_transcript(&self, transcript_uri: &str) -> Result<String>;
}

/// Transcription client talking to a REST job API.
pub struct HttpTranscriptionApi {
    base_url: String,
    api_key: String,
    language: String,
    client: Client,
}

impl HttpTranscriptionApi {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            client: Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl TranscriptionApi for HttpTranscriptionApi {
    async fn start_job(&self, media_uri: &str) -> Result<String> {
        let job_name = format!("transcribe-{}", Uuid::new_v4());
        let url = format!("{}/jobs", self.base_url);

        debug!("Starting transcription job {} for {}", job_name, media_uri);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "jobName": job_name,
                "mediaUri": media_uri,
                "mediaFormat": "wav",
                "languageCode": self.language,
            }))
            .send()
            .await
            .context("transcription job submit failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "transcription job rejected (HTTP {}): {}",
                status,
                body_snippet(&body)
            );
        }
        Ok(job_name)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("transcription status poll failed")?;

        if !response.status().is_success() {
            bail!("transcription status poll got HTTP {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("transcription status was not JSON")?;
        parse_job_status(&body)
    }

    async fn fetch_transcript(&self, transcript_uri: &str) -> Result<String> {
        let response = self
            .client
            .get(transcript_uri)
            .send()
            .await
            .context("transcript fetch failed")?;

        if !response.status().is_success() {
            bail!("transcript fetch got HTTP {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("transcript document was not JSON")?;
        body.get("text")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .context("transcript document missing text field")
    }
}

/// Map a job status document to [`JobStatus`].
fn parse_job_status(body: &serde_json::Value) -> Result<JobStatus> {
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .context("job status document missing status field")?;

    match status {
        "IN_PROGRESS" | "QUEUED" => Ok(JobStatus::InProgress),
        "COMPLETED" => {
            let uri = body
                .get("transcriptUri")
                .and_then(|v| v.as_str())
                .context("completed job missing transcriptUri")?;
            Ok(JobStatus::Completed {
                transcript_uri: uri.to_string(),
            })
        }
        "FAILED" => Ok(JobStatus::Failed {
            reason: body
                .get("failureReason")
                .and_then(|v| v.as_str())
                .unwrap_or("unspecified")
                .to_string(),
        }),
        other => bail!("unknown transcription job status: {}", other),
    }
}

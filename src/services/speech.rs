//! Speech synthesis service client.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::schema::TtsConfig;
use crate::services::body_snippet;

/// Text-to-speech behind a single call: text in, encoded audio out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to mp3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Synthesizer talking to a TTS REST endpoint.
pub struct HttpSpeechSynthesizer {
    base_url: String,
    api_key: String,
    voice: String,
    client: Client,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/synthesize", self.base_url);
        debug!("Synthesizing {} chars with voice {}", text.len(), self.voice);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "text": text,
                "voice": self.voice,
                "outputFormat": "mp3",
            }))
            .send()
            .await
            .context("speech synthesis request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "speech synthesis rejected (HTTP {}): {}",
                status,
                body_snippet(&body)
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("failed to read synthesized audio")?;
        if bytes.is_empty() {
            bail!("speech synthesis returned no audio");
        }
        Ok(bytes.to_vec())
    }
}

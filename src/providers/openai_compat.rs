//! OpenAI-compatible API provider.
//!
//! Calls any endpoint that implements the OpenAI chat completions format
//! (OpenRouter, Anthropic's compat endpoint, OpenAI, Groq, vLLM, ...)
//! directly via reqwest.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::base::{ChatProvider, ChatResponse};
use crate::errors::ProviderError;

/// A text-generation provider that talks to an OpenAI-compatible chat
/// completions endpoint.
pub struct OpenAICompatProvider {
    api_key: String,
    api_base: String,
    default_model: String,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider.
    ///
    /// When `api_base` is absent the endpoint is inferred from the key
    /// prefix, falling back to OpenRouter (which accepts routed model
    /// names like `anthropic/claude-3-haiku`).
    pub fn new(api_key: &str, api_base: Option<&str>, default_model: &str) -> Self {
        let resolved_base = if let Some(base) = api_base {
            base.trim_end_matches('/').to_string()
        } else if api_key.starts_with("sk-ant-") {
            "https://api.anthropic.com/v1".to_string()
        } else if api_key.starts_with("gsk_") {
            "https://api.groq.com/openai/v1".to_string()
        } else {
            "https://openrouter.ai/api/v1".to_string()
        };

        Self {
            api_key: api_key.to_string(),
            api_base: resolved_base,
            default_model: default_model.to_string(),
            client: Client::new(),
        }
    }
}

/// Pull the first choice's message text out of a chat completions response.
fn extract_content(body: &serde_json::Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

#[async_trait]
impl ChatProvider for OpenAICompatProvider {
    async fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.default_model,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        debug!("Chat request to {} (model {})", url, self.default_model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let err = if status.as_u16() == 401 || status.as_u16() == 403 {
                ProviderError::AuthError {
                    status: status.as_u16(),
                    message,
                }
            } else {
                ProviderError::ServerError {
                    status: status.as_u16(),
                    message,
                }
            };
            return Err(err.into());
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonParseError(e.to_string()))?;

        Ok(ChatResponse {
            content: extract_content(&parsed),
        })
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

//! Base text-generation provider interface.

use anyhow::Result;
use async_trait::async_trait;

/// Response from a text-generation provider.
///
/// `content` is `None` when the service replied but the response shape
/// carried no usable message — callers treat that the same as a failure.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
}

/// Abstract trait for text-generation providers.
///
/// Implementations handle the specifics of each provider's API while
/// keeping a narrow, fake-friendly interface at the seam.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a single system + user message pair and return the reply.
    ///
    /// # Arguments
    /// * `system` - System instruction (persona).
    /// * `user` - User message content.
    /// * `max_tokens` - Bound on generated output length.
    async fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Result<ChatResponse>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

//! Advisor prompting: fixed expert-developer persona over a chat provider.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::providers::base::ChatProvider;

/// Persona and behavioral directives for the advisor.
pub const SYSTEM_PROMPT: &str = "\
You are an expert senior software developer and architect with 15+ years of \
experience, pair programming with a developer through voice interaction. Your \
role is to:

1. ELEVATE their requests by identifying potential issues, security concerns, \
or better approaches
2. ASK CLARIFYING QUESTIONS when requirements are vague or potentially \
problematic
3. SUGGEST BEST PRACTICES and modern, secure, scalable solutions
4. PROVIDE SPECIFIC, ACTIONABLE guidance with code examples when appropriate
5. EXPLAIN WHY certain approaches are better (security, performance, \
maintainability)

Keep responses conversational but professional. If they ask for something \
insecure or poorly architected, guide them toward a better solution.";

/// Returned whenever the generation service fails or replies with an
/// unusable shape. The pipeline must always produce some spoken response.
pub const FALLBACK_RESPONSE: &str =
    "I'm having trouble processing your request right now. Could you try rephrasing it?";

/// Output-length cap, for cost control.
const MAX_RESPONSE_TOKENS: u32 = 1000;

/// Composes the advisor prompt and calls the text-generation provider.
pub struct Advisor {
    provider: Arc<dyn ChatProvider>,
}

impl Advisor {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Generate an advisor reply for `user_input` given the rendered
    /// `context_block` of recent turns.
    ///
    /// Infallible by design: any provider failure, and any response without
    /// text content, yields [`FALLBACK_RESPONSE`].
    pub async fn advise(&self, user_input: &str, context_block: &str) -> String {
        let user_message = format!(
            "Previous conversation:\n{}\n\nCurrent request: {}\n\nRespond as an expert developer advisor:",
            context_block, user_input
        );

        debug!(
            "Requesting advice from model {}",
            self.provider.default_model()
        );

        match self
            .provider
            .chat(SYSTEM_PROMPT, &user_message, MAX_RESPONSE_TOKENS)
            .await
        {
            Ok(response) => match response.content {
                Some(text) if !text.trim().is_empty() => text,
                _ => {
                    warn!("Generation response had no usable content, using fallback");
                    FALLBACK_RESPONSE.to_string()
                }
            },
            Err(e) => {
                warn!("Generation failed, using fallback: {:#}", e);
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}

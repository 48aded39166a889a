//! Conversation context assembly.
//!
//! Renders recent turn history into the text block handed to the advisor.
//! Pure function of its input: same history in, same block out.

use crate::store::turns::Turn;

/// At most this many turns are rendered into the context block.
pub const CONTEXT_TURNS: usize = 5;

/// Build a context block from a most-recent-first turn history.
///
/// Takes the 5 most recent turns and reverses them so the rendered
/// transcript reads oldest-first — the model must see causally ordered
/// history, not the store's retrieval order. Empty history renders to an
/// empty string.
pub fn build_context(history: &[Turn]) -> String {
    history
        .iter()
        .take(CONTEXT_TURNS)
        .rev()
        .map(|turn| {
            format!(
                "user: {}\nassistant: {}",
                turn.user_input, turn.ai_response
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Narrow interfaces over the external managed services, with
//! reqwest-backed implementations. Each client is an explicit dependency
//! object constructed at process start and handed to the pipeline.

pub mod blob;
pub mod speech;
pub mod transcription;

/// Bound a service error body for inclusion in an error message.
/// Truncates by character, not by byte, so multibyte content near the
/// cut point stays valid.
pub(crate) fn body_snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

//! Domain error types for voicebot.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured error handling via pattern matching.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Errors from the text-generation provider.
///
/// Embedded in `anyhow::Error` so the `ChatProvider` trait signature
/// (`-> anyhow::Result<ChatResponse>`) stays unchanged while callers
/// can downcast: `e.downcast_ref::<ProviderError>()`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParseError(String),

    #[error("Authentication failed (status {status}): {message}")]
    AuthError { status: u16, message: String },

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Transcription errors
// ---------------------------------------------------------------------------

/// Errors from the transcription waiter.
///
/// `JobFailed` and `Timeout` are distinct on purpose: a job the service
/// reports as failed must never surface as a timeout, and an exhausted
/// polling bound must never surface as a generic failure.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription job failed: {0}")]
    JobFailed(String),

    #[error("transcription timed out after {attempts} polling attempts")]
    Timeout { attempts: u32 },

    #[error("transcription service error: {0}")]
    Api(String),
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Failure of a single `process_turn` invocation.
///
/// The gateway maps each variant to a status code: `EmptyAudio` → 400,
/// `Transcribe` → 502 with a transcription-specific message, everything
/// else → a generic 500 with the detail kept in the server log.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no audio data provided")]
    EmptyAudio,

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let e = ProviderError::HttpError("connection refused".into());
        assert_eq!(e.to_string(), "HTTP request failed: connection refused");
    }

    #[test]
    fn test_provider_error_downcast() {
        let anyhow_err: anyhow::Error = ProviderError::AuthError {
            status: 401,
            message: "invalid key".into(),
        }
        .into();
        let downcasted = anyhow_err.downcast_ref::<ProviderError>();
        assert!(downcasted.is_some());
        assert!(matches!(
            downcasted.unwrap(),
            ProviderError::AuthError { status: 401, .. }
        ));
    }

    #[test]
    fn test_transcribe_error_display() {
        let e = TranscribeError::Timeout { attempts: 30 };
        assert!(e.to_string().contains("30"));
        let e = TranscribeError::JobFailed("bad media".into());
        assert!(e.to_string().contains("bad media"));
    }

    #[test]
    fn test_pipeline_error_from_transcribe() {
        let e: PipelineError = TranscribeError::JobFailed("x".into()).into();
        assert!(matches!(e, PipelineError::Transcribe(_)));
    }
}

//! Error types for mixvoice.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between text in and audio file out.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("nothing to speak: input is empty or whitespace-only")]
    InputEmpty,

    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// Cloned synthesis failed. Recovered by the fallback voice, so callers
    /// only see this in logs.
    #[error("voice cloning failed: {0}")]
    CloningFailed(String),

    #[error("synthesis stopped after {completed} of {total} runs: {source}")]
    PartialSynthesisFailure {
        completed: usize,
        total: usize,
        #[source]
        source: Box<VoiceError>,
    },

    #[error("audio concatenation failed: {0}")]
    ConcatenationFailed(String),

    #[error("reference voice not found: {}", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("no audio to play")]
    NothingToPlay,

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VoiceError {
    pub fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        VoiceError::BackendUnavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for mixvoice operations
pub type Result<T> = std::result::Result<T, VoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_reports_progress_and_cause() {
        let err = VoiceError::PartialSynthesisFailure {
            completed: 1,
            total: 3,
            source: Box::new(VoiceError::unavailable("primary", "connection refused")),
        };
        let msg = err.to_string();
        assert!(msg.contains("1 of 3"), "{msg}");
        assert!(msg.contains("connection refused"), "{msg}");
    }
}

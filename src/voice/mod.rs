//! Mixed-script speech synthesis.
//!
//! Components:
//! - `script`: per-character script classification
//! - `segmenter`: text → ordered same-script runs
//! - `service`: fast speech service (primary voice and fallback voice)
//! - `clone`: voice-cloning engine with one-time model load
//! - `profile`: voice ids, reference recording, cached cloning model
//! - `backend`: per-class backends, clone-then-fallback policy
//! - `dispatcher`: routes runs to backends, keeps run order
//! - `stitcher`: ffmpeg or native WAV concatenation
//! - `player`: rodio or external-command playback
//! - `orchestrator`: speak / speak_mixed / play / set_reference_voice / list_voices
//! - `history`: JSONL synthesis history and reporting
//! - `api`: Axum HTTP server exposing the orchestrator

pub mod api;
pub mod backend;
pub mod clone;
pub mod dispatcher;
pub mod history;
pub mod orchestrator;
pub mod player;
pub mod profile;
pub mod script;
pub mod segmenter;
pub mod service;
pub mod stitcher;

/// First 50 characters of `text`, for log lines.
pub(crate) fn preview(text: &str) -> String {
    let head: String = text.chars().take(50).collect();
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "ส".repeat(60);
        assert_eq!(preview(&long).chars().count(), 53);
        assert_eq!(preview("hello"), "hello");
    }
}

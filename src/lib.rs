//! mixvoice: mixed-script text-to-speech.
//!
//! Splits text that mixes two scripts (Thai and English by default) into
//! same-script runs, speaks each run with the right voice, and stitches the
//! audio back into one file in the original order.

pub mod config;
pub mod error;
pub mod voice;

pub use error::{Result, VoiceError};
pub use voice::orchestrator::{Services, VoiceOrchestrator};

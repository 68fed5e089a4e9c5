//! Per-class synthesis backends.
//!
//! Primary-class runs go straight to the fast speech service. Secondary-class
//! runs try the cloning model first and fall back to the fast service with
//! the secondary fallback voice.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::clone::CloneEngine;
use super::profile::VoiceProfile;
use super::script::ScriptClass;
use super::service::SpeechService;
use crate::error::{Result, VoiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendUsed {
    Primary,
    SecondaryClone,
    SecondaryFallback,
}

impl std::fmt::Display for BackendUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::SecondaryClone => write!(f, "secondary_clone"),
            Self::SecondaryFallback => write!(f, "secondary_fallback"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub class: ScriptClass,
    pub voice_hint: Option<String>,
    pub reference_audio: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub audio_path: PathBuf,
    pub backend_used: BackendUsed,
}

/// Outcome of one cloned-synthesis attempt.
#[derive(Debug)]
pub enum CloneAttempt {
    Succeeded(PathBuf),
    Failed(String),
    Skipped(&'static str),
}

pub struct PrimaryBackend {
    service: Arc<dyn SpeechService>,
}

impl PrimaryBackend {
    pub fn new(service: Arc<dyn SpeechService>) -> Self {
        Self { service }
    }

    /// Errors propagate: nothing sits below this backend.
    pub async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<PathBuf> {
        self.service.synthesize(text, voice, out_path).await?;
        Ok(out_path.to_path_buf())
    }
}

pub struct SecondaryBackend {
    engine: Option<Arc<dyn CloneEngine>>,
    fallback_service: Arc<dyn SpeechService>,
    language: String,
}

impl SecondaryBackend {
    /// `engine` is `None` when cloning is disabled in config.
    pub fn new(
        engine: Option<Arc<dyn CloneEngine>>,
        fallback: Arc<dyn SpeechService>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            fallback_service: fallback,
            language: language.into(),
        }
    }

    pub async fn synthesize(
        &self,
        profile: &VoiceProfile,
        request: &SynthesisRequest,
        out_path: &Path,
    ) -> Result<(PathBuf, BackendUsed)> {
        match self.attempt_clone(profile, request, out_path).await {
            CloneAttempt::Succeeded(path) => return Ok((path, BackendUsed::SecondaryClone)),
            CloneAttempt::Failed(reason) => {
                warn!(
                    "{}, falling back to {}",
                    VoiceError::CloningFailed(reason),
                    profile.secondary_voice()
                );
            }
            CloneAttempt::Skipped(why) => debug!("Cloning skipped: {why}"),
        }

        let voice = request
            .voice_hint
            .as_deref()
            .unwrap_or(profile.secondary_voice());
        let path = self.fallback(&request.text, voice, out_path).await?;
        Ok((path, BackendUsed::SecondaryFallback))
    }

    /// Try cloned synthesis. Never errors; failures come back tagged.
    pub async fn attempt_clone(
        &self,
        profile: &VoiceProfile,
        request: &SynthesisRequest,
        out_path: &Path,
    ) -> CloneAttempt {
        let Some(engine) = self.engine.as_deref() else {
            return CloneAttempt::Skipped("cloning disabled");
        };
        let Some(reference) = request.reference_audio.as_deref() else {
            return CloneAttempt::Skipped("no reference audio configured");
        };
        if !tokio::fs::try_exists(reference).await.unwrap_or(false) {
            return CloneAttempt::Skipped("reference audio missing");
        }

        let t0 = Instant::now();
        let mut slot = profile.lock_model().await;
        let model = match slot.get_or_load(engine).await {
            Ok(model) => model,
            Err(e) => return CloneAttempt::Failed(format!("model load failed: {e}")),
        };

        match model
            .synthesize(&request.text, reference, &self.language, out_path)
            .await
        {
            Ok(()) => {
                info!("Cloned voice: {} ({}ms)", out_path.display(), t0.elapsed().as_millis());
                CloneAttempt::Succeeded(out_path.to_path_buf())
            }
            Err(e) => CloneAttempt::Failed(e.to_string()),
        }
    }

    /// Fast-service synthesis with the fallback voice. Errors are fatal.
    pub async fn fallback(&self, text: &str, voice: &str, out_path: &Path) -> Result<PathBuf> {
        self.fallback_service.synthesize(text, voice, out_path).await?;
        info!("Fallback voice: {}", out_path.display());
        Ok(out_path.to_path_buf())
    }
}

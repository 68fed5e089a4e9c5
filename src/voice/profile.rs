//! Voice profile: voice ids, the cloning reference, and the lazily loaded
//! cloning model shared by every Secondary-class run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::info;

use super::clone::{CloneEngine, CloneModel};
use crate::error::Result;

/// Voices available to the orchestrator, as reported by `list_voices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceListing {
    pub primary: String,
    /// Only present when the reference recording exists.
    pub secondary_clone: Option<PathBuf>,
    pub secondary_fallback: String,
}

pub struct VoiceProfile {
    primary_voice: String,
    secondary_voice: String,
    reference_audio: RwLock<Option<PathBuf>>,
    // Held for the whole load + clone call: one load in flight, clone calls serialized.
    model: AsyncMutex<Option<Arc<dyn CloneModel>>>,
    loaded: AtomicBool,
}

impl VoiceProfile {
    pub fn new(
        primary_voice: impl Into<String>,
        secondary_voice: impl Into<String>,
        reference_audio: Option<PathBuf>,
    ) -> Self {
        Self {
            primary_voice: primary_voice.into(),
            secondary_voice: secondary_voice.into(),
            reference_audio: RwLock::new(reference_audio),
            model: AsyncMutex::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn primary_voice(&self) -> &str {
        &self.primary_voice
    }

    pub fn secondary_voice(&self) -> &str {
        &self.secondary_voice
    }

    pub fn reference_audio(&self) -> Option<PathBuf> {
        self.reference_audio.read().unwrap().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Swap the reference recording and drop the loaded model so the next
    /// Secondary-class run reloads against the new voice.
    pub async fn set_reference(&self, path: &Path) {
        let mut model = self.model.lock().await;
        *self.reference_audio.write().unwrap() = Some(path.to_path_buf());
        self.unload(&mut model);
        info!("Voice changed: {}", path.display());
    }

    /// Drop the loaded model, keeping the reference.
    pub async fn reset(&self) {
        let mut model = self.model.lock().await;
        self.unload(&mut model);
    }

    fn unload(&self, model: &mut Option<Arc<dyn CloneModel>>) {
        *model = None;
        self.loaded.store(false, Ordering::Release);
    }

    /// Take exclusive use of the cloning model for one synthesis call.
    pub async fn lock_model(&self) -> ModelSlot<'_> {
        ModelSlot {
            guard: self.model.lock().await,
            loaded: &self.loaded,
        }
    }

    pub fn listing(&self) -> VoiceListing {
        VoiceListing {
            primary: self.primary_voice.clone(),
            secondary_clone: self.reference_audio().filter(|p| p.exists()),
            secondary_fallback: self.secondary_voice.clone(),
        }
    }
}

/// Exclusive access to the profile's model slot.
pub struct ModelSlot<'a> {
    guard: MutexGuard<'a, Option<Arc<dyn CloneModel>>>,
    loaded: &'a AtomicBool,
}

impl ModelSlot<'_> {
    /// Return the cached model, loading it through `engine` on first use.
    pub async fn get_or_load(&mut self, engine: &dyn CloneEngine) -> Result<Arc<dyn CloneModel>> {
        if let Some(model) = self.guard.as_ref() {
            return Ok(model.clone());
        }
        let model = engine.load().await?;
        *self.guard = Some(model.clone());
        self.loaded.store(true, Ordering::Release);
        Ok(model)
    }
}

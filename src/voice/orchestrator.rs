//! Caller-facing facade: speak, speak mixed text, play, change voice.
//!
//! speak_mixed: text → runs → per-run audio (dispatcher) → one file (stitcher)

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use super::backend::{PrimaryBackend, SecondaryBackend, SynthesisResult};
use super::clone::{CloneEngine, XttsServerEngine};
use super::dispatcher::{Dispatcher, IntermediateFiles};
use super::history::{now_timestamp, History, SynthesisRecord};
use super::player::Player;
use super::profile::{VoiceListing, VoiceProfile};
use super::script::{ScriptClass, ScriptClassifier};
use super::segmenter::{Segmenter, TextRun};
use super::service::{HttpSpeechService, SpeechService};
use super::stitcher::Stitcher;
use super::preview;
use crate::config::Config;
use crate::error::{Result, VoiceError};

/// External collaborators the orchestrator talks to.
pub struct Services {
    pub speech: Arc<dyn SpeechService>,
    pub clone: Option<Arc<dyn CloneEngine>>,
}

impl Services {
    /// HTTP-backed services from config.
    pub fn from_config(config: &Config) -> Self {
        let clone: Option<Arc<dyn CloneEngine>> = if config.clone.enabled {
            Some(Arc::new(XttsServerEngine::new(&config.clone)))
        } else {
            None
        };
        Self {
            speech: Arc::new(HttpSpeechService::new(&config.primary)),
            clone,
        }
    }
}

pub struct VoiceOrchestrator {
    segmenter: Segmenter,
    dispatcher: Dispatcher,
    stitcher: Stitcher,
    player: Player,
    profile: VoiceProfile,
    history: History,
    output_dir: PathBuf,
    last_output: Mutex<Option<PathBuf>>,
    cloning: bool,
}

impl VoiceOrchestrator {
    pub fn new(config: &Config, services: Services) -> Result<Self> {
        std::fs::create_dir_all(&config.output.dir)?;

        let classifier = ScriptClassifier::new(&config.script);
        let cloning = services.clone.is_some();
        let dispatcher = Dispatcher::new(
            PrimaryBackend::new(services.speech.clone()),
            SecondaryBackend::new(services.clone, services.speech, config.clone.language.clone()),
        );
        let history = if config.history.enabled {
            History::new(config.history.dir.clone())
        } else {
            History::disabled()
        };

        Ok(Self {
            segmenter: Segmenter::new(classifier),
            dispatcher,
            stitcher: Stitcher::new(&config.stitcher),
            player: Player::new(&config.playback),
            profile: VoiceProfile::new(
                config.voices.primary.clone(),
                config.voices.secondary_fallback.clone(),
                config.voices.reference_audio.clone(),
            ),
            history,
            output_dir: config.output.dir.clone(),
            last_output: Mutex::new(None),
            cloning,
        })
    }

    pub fn profile(&self) -> &VoiceProfile {
        &self.profile
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn last_output(&self) -> Option<PathBuf> {
        self.last_output.lock().unwrap().clone()
    }

    /// Speak `text` with one backend, chosen by whole-text detection.
    pub async fn speak(&self, text: &str, output: Option<PathBuf>) -> Result<PathBuf> {
        let class = self.segmenter.classifier().detect(text);
        self.speak_single("speak", text, class, output).await
    }

    /// Speak `text` with the backend for `class`, skipping detection.
    pub async fn speak_as(
        &self,
        text: &str,
        class: ScriptClass,
        output: Option<PathBuf>,
    ) -> Result<PathBuf> {
        self.speak_single("speak_as", text, class, output).await
    }

    async fn speak_single(
        &self,
        mode: &str,
        text: &str,
        class: ScriptClass,
        output: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let t0 = Instant::now();
        let outcome = match text.trim() {
            "" => Err(VoiceError::InputEmpty),
            trimmed => {
                let output = output.unwrap_or_else(|| self.default_output("voice"));
                let run = TextRun::new(class, trimmed);
                info!("[{class}] {}", preview(trimmed));
                self.dispatcher
                    .synthesize_to(&self.profile, &run, &output)
                    .await
                    .map(|result| (result.audio_path.clone(), vec![result]))
            }
        };
        self.finish(mode, text, t0, outcome)
    }

    /// Speak mixed-script text: split into runs, synthesize each with its
    /// backend, stitch into one file. Either the whole file or an error.
    pub async fn speak_mixed(&self, text: &str, output: Option<PathBuf>) -> Result<PathBuf> {
        let t0 = Instant::now();
        let outcome = self.speak_mixed_inner(text, output).await;
        self.finish("speak_mixed", text, t0, outcome)
    }

    async fn speak_mixed_inner(
        &self,
        text: &str,
        output: Option<PathBuf>,
    ) -> Result<(PathBuf, Vec<SynthesisResult>)> {
        let runs = self.segmenter.segment(text)?;
        let output = output.unwrap_or_else(|| self.default_output("mixed"));
        info!("Mixed text: {} runs -> {}", runs.len(), output.display());

        let results = self.dispatcher.dispatch(&self.profile, &runs, &output).await?;
        if let [single] = results.as_slice() {
            return Ok((single.audio_path.clone(), results));
        }

        let paths: Vec<PathBuf> = results.iter().map(|r| r.audio_path.clone()).collect();
        let cleanup = IntermediateFiles::new(paths.clone());
        let stitched = self.stitcher.concatenate(&paths, &output).await?;
        cleanup.keep();
        Ok((stitched, results))
    }

    fn finish(
        &self,
        mode: &str,
        text: &str,
        t0: Instant,
        outcome: Result<(PathBuf, Vec<SynthesisResult>)>,
    ) -> Result<PathBuf> {
        let latency_ms = t0.elapsed().as_millis() as i64;
        let mut record = SynthesisRecord {
            timestamp: now_timestamp(),
            mode: mode.to_string(),
            input_text_chars: text.chars().count(),
            runs: 0,
            backends: Vec::new(),
            output: None,
            latency_ms,
            error: None,
        };

        let result = match outcome {
            Ok((output, results)) => {
                record.runs = results.len();
                record.backends = results.iter().map(|r| r.backend_used.to_string()).collect();
                record.output = Some(output.display().to_string());
                *self.last_output.lock().unwrap() = Some(output.clone());
                info!("Saved: {} ({latency_ms}ms)", output.display());
                Ok(output)
            }
            Err(e) => {
                warn!("{mode} failed: {e}");
                record.error = Some(e.to_string());
                Err(e)
            }
        };

        self.history.save(&record);
        result
    }

    /// Play `path`, or the last file this orchestrator produced.
    pub async fn play(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.last_output().ok_or(VoiceError::NothingToPlay)?,
        };
        self.player.play(&path).await
    }

    /// Use a new reference recording for cloning. Drops the loaded model.
    pub async fn set_reference_voice(&self, path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(VoiceError::ReferenceNotFound(path.to_path_buf()));
        }
        self.profile.set_reference(path).await;
        Ok(())
    }

    /// Without a cloning engine every Secondary run uses the fallback voice,
    /// so no clone voice is listed.
    pub fn list_voices(&self) -> VoiceListing {
        let mut listing = self.profile.listing();
        if !self.cloning {
            listing.secondary_clone = None;
        }
        listing
    }

    fn default_output(&self, prefix: &str) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f");
        self.output_dir.join(format!("{prefix}_{stamp}.wav"))
    }
}

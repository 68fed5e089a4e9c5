//! Route text runs to backends and collect audio in run order.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::backend::{
    BackendUsed, PrimaryBackend, SecondaryBackend, SynthesisRequest, SynthesisResult,
};
use super::profile::VoiceProfile;
use super::script::ScriptClass;
use super::segmenter::TextRun;
use super::preview;
use crate::error::{Result, VoiceError};

pub struct Dispatcher {
    primary: PrimaryBackend,
    secondary: SecondaryBackend,
}

impl Dispatcher {
    pub fn new(primary: PrimaryBackend, secondary: SecondaryBackend) -> Self {
        Self { primary, secondary }
    }

    /// Synthesize every run, in order. A single run is written straight to
    /// `output`; otherwise each run gets its own intermediate file next to it.
    ///
    /// Stops at the first fatal error and deletes whatever was produced.
    pub async fn dispatch(
        &self,
        profile: &VoiceProfile,
        runs: &[TextRun],
        output: &Path,
    ) -> Result<Vec<SynthesisResult>> {
        match runs {
            [] => return Err(VoiceError::InputEmpty),
            [run] => return Ok(vec![self.synthesize_to(profile, run, output).await?]),
            _ => {}
        }

        let total = runs.len();
        let mut produced = IntermediateFiles::default();
        let mut results = Vec::with_capacity(total);

        for (index, run) in runs.iter().enumerate() {
            let path = intermediate_path(output, index);
            debug!("Run {}/{total} [{}]: {}", index + 1, run.class, preview(&run.text));

            match self.synthesize_run(profile, run, &path).await {
                Ok(result) => {
                    produced.push(result.audio_path.clone());
                    results.push(result);
                }
                Err(e) => {
                    // A stray partial file may exist even though the run failed.
                    produced.push(path);
                    warn!("Run {}/{total} failed: {e}", index + 1);
                    return Err(if results.is_empty() {
                        e
                    } else {
                        VoiceError::PartialSynthesisFailure {
                            completed: results.len(),
                            total,
                            source: Box::new(e),
                        }
                    });
                }
            }
        }

        produced.keep();
        info!("Dispatched {total} runs");
        Ok(results)
    }

    /// Synthesize one run straight to `output`. Whatever a failed attempt left
    /// at `output` is removed.
    pub async fn synthesize_to(
        &self,
        profile: &VoiceProfile,
        run: &TextRun,
        output: &Path,
    ) -> Result<SynthesisResult> {
        let produced = IntermediateFiles::new(vec![output.to_path_buf()]);
        let result = self.synthesize_run(profile, run, output).await?;
        produced.keep();
        Ok(result)
    }

    /// Synthesize one run to `out_path` with the backend its class calls for.
    pub async fn synthesize_run(
        &self,
        profile: &VoiceProfile,
        run: &TextRun,
        out_path: &Path,
    ) -> Result<SynthesisResult> {
        let request = SynthesisRequest {
            text: run.text.clone(),
            class: run.class,
            voice_hint: None,
            reference_audio: profile.reference_audio(),
        };
        self.synthesize(profile, &request, out_path).await
    }

    pub async fn synthesize(
        &self,
        profile: &VoiceProfile,
        request: &SynthesisRequest,
        out_path: &Path,
    ) -> Result<SynthesisResult> {
        match request.class {
            ScriptClass::Primary => {
                let voice = request.voice_hint.as_deref().unwrap_or(profile.primary_voice());
                let audio_path = self.primary.synthesize(&request.text, voice, out_path).await?;
                Ok(SynthesisResult {
                    audio_path,
                    backend_used: BackendUsed::Primary,
                })
            }
            ScriptClass::Secondary => {
                let (audio_path, backend_used) =
                    self.secondary.synthesize(profile, request, out_path).await?;
                Ok(SynthesisResult {
                    audio_path,
                    backend_used,
                })
            }
        }
    }
}

/// `<stem>.part<NN>.<ext>` next to `output`.
pub fn intermediate_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mixvoice".into());
    let ext = output
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".into());
    output.with_file_name(format!("{stem}.part{index:02}.{ext}"))
}

/// Files that are deleted when this guard drops, unless `keep` was called.
#[derive(Debug, Default)]
pub struct IntermediateFiles {
    paths: Vec<PathBuf>,
}

impl IntermediateFiles {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Hand the files on to a later stage instead of deleting them.
    pub fn keep(mut self) {
        self.paths.clear();
    }
}

impl Drop for IntermediateFiles {
    fn drop(&mut self) {
        remove_files(&self.paths);
    }
}

/// Delete files, logging failures. Files that never existed are ignored.
pub fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_paths_are_distinct_and_keep_extension() {
        let out = Path::new("/tmp/out/mixed_1.wav");
        assert_eq!(intermediate_path(out, 0), PathBuf::from("/tmp/out/mixed_1.part00.wav"));
        assert_eq!(intermediate_path(out, 11), PathBuf::from("/tmp/out/mixed_1.part11.wav"));
        let other = Path::new("/tmp/out/mixed_2.wav");
        assert_ne!(intermediate_path(out, 1), intermediate_path(other, 1));
    }

    #[test]
    fn guard_deletes_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"x").unwrap();

        drop(IntermediateFiles::new(vec![a.clone(), dir.path().join("missing.wav")]));
        assert!(!a.exists());

        IntermediateFiles::new(vec![b.clone()]).keep();
        assert!(b.exists());
    }
}

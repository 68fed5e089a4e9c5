//! Join ordered audio files into one output.
//!
//! The ffmpeg path stream-copies through the concat demuxer, so inputs must
//! share a codec. The native path does the same for WAV files in-process.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::dispatcher::remove_files;
use crate::config::{StitchMethod, StitcherConfig};
use crate::error::{Result, VoiceError};

pub struct Stitcher {
    method: StitchMethod,
    ffmpeg_path: String,
}

impl Stitcher {
    pub fn new(config: &StitcherConfig) -> Self {
        Self {
            method: config.method,
            ffmpeg_path: config.ffmpeg_path.clone(),
        }
    }

    /// Concatenate `inputs` in order into `output`, then delete the inputs.
    pub async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf> {
        if inputs.is_empty() {
            return Err(VoiceError::ConcatenationFailed("no input files".into()));
        }
        for input in inputs {
            if !tokio::fs::try_exists(input).await.unwrap_or(false) {
                return Err(VoiceError::ConcatenationFailed(format!(
                    "missing input {}",
                    input.display()
                )));
            }
        }

        let t0 = Instant::now();
        let joined = match self.method {
            StitchMethod::Ffmpeg => self.concat_ffmpeg(inputs, output).await,
            StitchMethod::Native => concat_wav(inputs.to_vec(), output.to_path_buf()).await,
        };

        if let Err(e) = joined {
            if let Err(rm) = tokio::fs::remove_file(output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial output {}: {rm}", output.display());
                }
            }
            return Err(e);
        }

        let intermediates: Vec<PathBuf> = inputs
            .iter()
            .filter(|p| p.as_path() != output)
            .cloned()
            .collect();
        remove_files(&intermediates);

        info!(
            "Stitched {} files into {} ({}ms)",
            inputs.len(),
            output.display(),
            t0.elapsed().as_millis()
        );
        Ok(output.to_path_buf())
    }

    async fn concat_ffmpeg(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let manifest = manifest_path(output);
        tokio::fs::write(&manifest, manifest_contents(inputs)).await?;

        let result = Command::new(&self.ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(&manifest)
            .args(["-c", "copy"])
            .arg(output)
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&manifest).await {
            warn!("Failed to remove concat manifest {}: {e}", manifest.display());
        }

        let out = result.map_err(|e| {
            VoiceError::ConcatenationFailed(format!("failed to run {}: {e}", self.ffmpeg_path))
        })?;

        let produced = tokio::fs::metadata(output)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !out.status.success() || !produced {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(VoiceError::ConcatenationFailed(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                stderr.trim()
            )));
        }
        debug!("ffmpeg concatenated {} inputs", inputs.len());
        Ok(())
    }
}

pub fn manifest_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mixvoice".into());
    output.with_file_name(format!("{stem}.concat.txt"))
}

/// ffmpeg concat demuxer list. Single quotes inside paths are closed,
/// escaped, and reopened.
fn manifest_contents(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let path = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            let quoted = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{quoted}'\n")
        })
        .collect()
}

async fn concat_wav(inputs: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || concat_wav_sync(&inputs, &output))
        .await
        .map_err(|e| VoiceError::ConcatenationFailed(format!("stitch task failed: {e}")))?
}

fn concat_wav_sync(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let failed = |path: &Path, e: hound::Error| {
        VoiceError::ConcatenationFailed(format!("{}: {e}", path.display()))
    };

    let first = hound::WavReader::open(&inputs[0]).map_err(|e| failed(&inputs[0], e))?;
    let spec = first.spec();
    drop(first);

    let mut writer = hound::WavWriter::create(output, spec).map_err(|e| failed(output, e))?;

    for input in inputs {
        let mut reader = hound::WavReader::open(input).map_err(|e| failed(input, e))?;
        if reader.spec() != spec {
            return Err(VoiceError::ConcatenationFailed(format!(
                "{} does not match format of {} ({:?} vs {:?})",
                input.display(),
                inputs[0].display(),
                reader.spec(),
                spec
            )));
        }
        match spec.sample_format {
            hound::SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    let sample = sample.map_err(|e| failed(input, e))?;
                    writer.write_sample(sample).map_err(|e| failed(output, e))?;
                }
            }
            hound::SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    let sample = sample.map_err(|e| failed(input, e))?;
                    writer.write_sample(sample).map_err(|e| failed(output, e))?;
                }
            }
        }
    }

    writer.finalize().map_err(|e| failed(output, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StitcherConfig;

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn native() -> Stitcher {
        Stitcher::new(&StitcherConfig {
            method: StitchMethod::Native,
            ..StitcherConfig::default()
        })
    }

    #[tokio::test]
    async fn native_concat_preserves_order_and_removes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("out.part00.wav");
        let b = dir.path().join("out.part01.wav");
        let c = dir.path().join("out.part02.wav");
        write_wav(&a, 24000, &[1, 2]);
        write_wav(&b, 24000, &[3]);
        write_wav(&c, 24000, &[4, 5, 6]);
        let out = dir.path().join("out.wav");

        let path = native().concatenate(&[a.clone(), b.clone(), c.clone()], &out).await.unwrap();
        assert_eq!(path, out);

        let samples: Vec<i16> = hound::WavReader::open(&out)
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
        assert!(!a.exists() && !b.exists() && !c.exists());
        assert!(!manifest_path(&out).exists());
    }

    #[tokio::test]
    async fn native_concat_rejects_mismatched_formats() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, 24000, &[1]);
        write_wav(&b, 16000, &[2]);
        let out = dir.path().join("out.wav");

        let err = native().concatenate(&[a.clone(), b.clone()], &out).await.unwrap_err();
        assert!(matches!(err, VoiceError::ConcatenationFailed(_)));
        assert!(!out.exists());
        // Inputs stay for the caller's cleanup guard.
        assert!(a.exists() && b.exists());
    }

    #[tokio::test]
    async fn missing_input_is_concatenation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = native()
            .concatenate(&[dir.path().join("nope.wav")], &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::ConcatenationFailed(_)));
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_concatenation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        write_wav(&a, 24000, &[1]);
        let out = dir.path().join("out.wav");
        let stitcher = Stitcher::new(&StitcherConfig {
            method: StitchMethod::Ffmpeg,
            ffmpeg_path: "/nonexistent/ffmpeg".into(),
        });

        let err = stitcher.concatenate(&[a.clone()], &out).await.unwrap_err();
        assert!(matches!(err, VoiceError::ConcatenationFailed(_)));
        assert!(!manifest_path(&out).exists());
        assert!(!out.exists());
    }

    /// Shell stand-in for ffmpeg that copies its `-i` manifest to `capture`
    /// and writes a placeholder to the output (last) argument.
    fn fake_ffmpeg(dir: &Path, capture: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg");
        let body = r#"#!/bin/sh
prev=
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then cp "$arg" CAPTURE; fi
  prev="$arg"
done
printf joined > "$prev"
"#
        .replace("CAPTURE", &format!("'{}'", capture.display()));
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    #[tokio::test]
    async fn ffmpeg_concat_feeds_manifest_in_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("captured.txt");
        let stitcher = Stitcher::new(&StitcherConfig {
            method: StitchMethod::Ffmpeg,
            ffmpeg_path: fake_ffmpeg(dir.path(), &capture),
        });
        let a = dir.path().join("o.part00.wav");
        let b = dir.path().join("o.part01.wav");
        write_wav(&a, 24000, &[1]);
        write_wav(&b, 24000, &[2]);
        let out = dir.path().join("o.wav");

        let path = stitcher.concatenate(&[a.clone(), b.clone()], &out).await.unwrap();

        assert_eq!(path, out);
        assert_eq!(
            std::fs::read_to_string(&capture).unwrap(),
            format!("file '{}'\nfile '{}'\n", a.display(), b.display())
        );
        assert_eq!(std::fs::read(&out).unwrap(), b"joined");
        assert!(!a.exists() && !b.exists());
        assert!(!manifest_path(&out).exists());
    }

    #[test]
    fn manifest_lists_inputs_in_order_with_quotes_escaped() {
        let inputs = vec![PathBuf::from("/a/one.wav"), PathBuf::from("/a/it's.wav")];
        assert_eq!(
            manifest_contents(&inputs),
            "file '/a/one.wav'\nfile '/a/it'\\''s.wav'\n"
        );
    }
}

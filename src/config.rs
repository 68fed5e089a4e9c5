//! Configuration management for mixvoice.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so an empty or missing file yields a working setup that talks to
//! local speech services.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::voice::script::ScriptClass;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    /// Voice id for Primary-class runs.
    pub primary: String,
    /// Voice id used when Secondary-class runs cannot be cloned.
    pub secondary_fallback: String,
    /// Reference recording for voice cloning of Secondary-class runs.
    pub reference_audio: Option<PathBuf>,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            primary: "en-US-AriaNeural".into(),
            secondary_fallback: "th-TH-PremwadeeNeural".into(),
            reference_audio: dirs::home_dir()
                .map(|h| h.join(".config/mixvoice/voices/reference.wav")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechServiceConfig {
    pub host: String,
    pub model: String,
    pub speed: f32,
    pub timeout_secs: u64,
}

impl Default for SpeechServiceConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:5050".into(),
            model: "tts-1".into(),
            speed: 1.0,
            timeout_secs: 30,
        }
    }
}

/// Cloning server settings.
///
/// The stock XTTS v2 checkpoint has no Thai. With the defaults every
/// Thai run falls back to `voices.secondary_fallback` until `model` names a
/// Thai-capable checkpoint. To clone the Latin side instead, set
/// `script.block_class: primary` and `language: en`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloneConfig {
    pub enabled: bool,
    pub host: String,
    /// Model the server loads. Must support `language`.
    pub model: String,
    /// Language hint passed with every cloned synthesis request.
    pub language: String,
    pub load_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "http://localhost:8020".into(),
            model: "tts_models/multilingual/multi-dataset/xtts_v2".into(),
            language: "th".into(),
            load_timeout_secs: 300,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub block_start: char,
    pub block_end: char,
    /// Class assigned to characters inside the block.
    pub block_class: ScriptClass,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            block_start: '\u{0E00}',
            block_end: '\u{0E7F}',
            block_class: ScriptClass::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchMethod {
    /// ffmpeg concat demuxer with stream copy.
    Ffmpeg,
    /// In-process WAV concatenation.
    Native,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StitcherConfig {
    pub method: StitchMethod,
    pub ffmpeg_path: String,
}

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            method: StitchMethod::Ffmpeg,
            ffmpeg_path: "ffmpeg".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// External player command. Empty means play in-process via rodio.
    pub command: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let dir = dirs::audio_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixvoice");
        Self { dir }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 8768 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".mixvoice-history"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub voices: VoicesConfig,
    pub primary: SpeechServiceConfig,
    pub clone: CloneConfig,
    pub script: ScriptConfig,
    pub stitcher: StitcherConfig,
    pub playback: PlaybackConfig,
    pub output: OutputConfig,
    pub api: ApiConfig,
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./mixvoice.yaml
    /// 2. ~/.config/mixvoice/config.yaml
    /// 3. /etc/mixvoice/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("mixvoice.yaml")),
                dirs::home_dir().map(|h| h.join(".config/mixvoice/config.yaml")),
                Some(PathBuf::from("/etc/mixvoice/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_route_thai_to_secondary() {
        let config = Config::default();
        assert_eq!(config.script.block_start, '\u{0E00}');
        assert_eq!(config.script.block_end, '\u{0E7F}');
        assert_eq!(config.script.block_class, ScriptClass::Secondary);
        assert_eq!(config.stitcher.method, StitchMethod::Ffmpeg);
        assert!(config.playback.command.is_empty());
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let yaml = r#"
voices:
  primary: en-GB-SoniaNeural
stitcher:
  method: native
clone:
  enabled: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.voices.primary, "en-GB-SoniaNeural");
        assert_eq!(config.voices.secondary_fallback, "th-TH-PremwadeeNeural");
        assert_eq!(config.stitcher.method, StitchMethod::Native);
        assert_eq!(config.stitcher.ffmpeg_path, "ffmpeg");
        assert!(!config.clone.enabled);
        assert_eq!(config.clone.language, "th");
    }

    #[test]
    fn latin_side_can_be_the_cloned_class() {
        let yaml = r#"
script:
  block_class: primary
clone:
  language: en
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.script.block_class, ScriptClass::Primary);
        assert!(crate::voice::clone::supports_language(
            &config.clone.model,
            &config.clone.language
        ));
        let classifier = crate::voice::script::ScriptClassifier::new(&config.script);
        assert_eq!(classifier.script_of('h'), Some(ScriptClass::Secondary));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/mixvoice.yaml")));
        assert_eq!(config.api.port, 8768);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "voices: [unclosed").unwrap();
        let config = Config::load(Some(&path));
        assert_eq!(config.voices.primary, "en-US-AriaNeural");
    }
}

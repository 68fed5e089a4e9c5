//! Voice-cloning engine.
//!
//! Loading the cloning model is slow (tens of seconds, sometimes a model
//! download), so it is split from synthesis: `CloneEngine::load` runs once and
//! hands back a `CloneModel` that the voice profile keeps for reuse.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::CloneConfig;
use crate::error::{Result, VoiceError};

#[async_trait]
pub trait CloneEngine: Send + Sync {
    /// Load the model. Called at most once per profile lifetime.
    async fn load(&self) -> Result<Arc<dyn CloneModel>>;
}

#[async_trait]
pub trait CloneModel: Send + Sync {
    /// Speak `text` in the voice of `reference`, writing audio to `out_path`.
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
        out_path: &Path,
    ) -> Result<()>;
}

/// Client for a local XTTS-style cloning server.
pub struct XttsServerEngine {
    host: String,
    model: String,
    load_timeout: Duration,
    timeout: Duration,
}

/// Languages the stock XTTS v2 checkpoint was trained on.
const XTTS_V2_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "hu", "ko",
    "ja", "hi",
];

/// Whether `model` can clone speech in `language`. Only the stock XTTS v2
/// checkpoint is known; any other model is assumed to handle its language.
pub fn supports_language(model: &str, language: &str) -> bool {
    if !model.ends_with("xtts_v2") {
        return true;
    }
    XTTS_V2_LANGUAGES.contains(&language.to_lowercase().as_str())
}

impl XttsServerEngine {
    pub fn new(config: &CloneConfig) -> Self {
        if !supports_language(&config.model, &config.language) {
            warn!(
                "Cloning model {} does not support language '{}'; cloned runs will fall back",
                config.model, config.language
            );
        }
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

fn unavailable(reason: impl Into<String>) -> VoiceError {
    VoiceError::unavailable("clone engine", reason)
}

#[async_trait]
impl CloneEngine for XttsServerEngine {
    async fn load(&self) -> Result<Arc<dyn CloneModel>> {
        info!("Loading cloning model {} on {}...", self.model, self.host);
        let t0 = Instant::now();

        let load_client = Client::builder()
            .timeout(self.load_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let url = format!("{}/model/load", self.host);
        let resp = load_client
            .post(&url)
            .json(&json!({ "model": self.model }))
            .send()
            .await
            .map_err(|e| unavailable(format!("model load request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(unavailable(format!("model load returned status {}", resp.status())));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        info!("Cloning model loaded in {}ms", t0.elapsed().as_millis());
        Ok(Arc::new(XttsServerModel {
            host: self.host.clone(),
            client,
        }))
    }
}

struct XttsServerModel {
    host: String,
    client: Client,
}

#[async_trait]
impl CloneModel for XttsServerModel {
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
        out_path: &Path,
    ) -> Result<()> {
        let body = json!({
            "text": text,
            "speaker_wav": reference.to_string_lossy(),
            "language": language,
        });

        let url = format!("{}/tts_to_audio/", self.host);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(unavailable(format!("server returned status {}", resp.status())));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read audio body: {e}")))?;
        if audio.is_empty() {
            return Err(unavailable("server returned empty audio"));
        }

        tokio::fs::write(out_path, &audio).await?;
        debug!("Cloned {} bytes to {}", audio.len(), out_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XTTS: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

    #[test]
    fn stock_xtts_has_no_thai() {
        assert!(!supports_language(XTTS, "th"));
        assert!(supports_language(XTTS, "en"));
        assert!(supports_language(XTTS, "zh-CN"));
    }

    #[test]
    fn other_models_are_trusted() {
        assert!(supports_language("thai-xtts-finetune", "th"));
    }

    #[test]
    fn default_config_pairs_model_and_language_as_documented() {
        let config = CloneConfig::default();
        assert!(!supports_language(&config.model, &config.language));
    }
}

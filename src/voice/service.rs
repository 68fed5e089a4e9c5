//! Fast speech service: text + voice id → WAV file.
//!
//! Talks to an OpenAI-compatible `/v1/audio/speech` endpoint (an Edge-TTS
//! bridge or Kokoro-FastAPI both work). Used for Primary-class runs and as
//! the fallback for Secondary-class runs.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::SpeechServiceConfig;
use crate::error::{Result, VoiceError};

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize `text` with `voice` and write the audio to `out_path`.
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()>;
}

pub struct HttpSpeechService {
    host: String,
    model: String,
    speed: f32,
    client: Client,
}

impl HttpSpeechService {
    pub fn new(config: &SpeechServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            speed: config.speed,
            client,
        }
    }

    fn unavailable(reason: impl Into<String>) -> VoiceError {
        VoiceError::unavailable("speech service", reason)
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": "wav",
            "speed": self.speed,
        });

        let url = format!("{}/v1/audio/speech", self.host);
        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                Self::unavailable(format!("cannot connect to {}", self.host))
            } else if e.is_timeout() {
                Self::unavailable("request timed out")
            } else {
                Self::unavailable(format!("request failed: {e}"))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Self::unavailable(format!("returned status {status}: {}", detail.trim())));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| Self::unavailable(format!("failed to read audio body: {e}")))?;
        if audio.is_empty() {
            return Err(Self::unavailable("returned empty audio"));
        }

        tokio::fs::write(out_path, &audio).await?;
        debug!(
            "Speech service wrote {} bytes to {} ({voice}, {:.0}ms)",
            audio.len(),
            out_path.display(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }
}

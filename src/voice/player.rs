//! Audio playback: in-process via rodio, or an external player command.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStreamBuilder, Sink};
use tokio::process::Command;
use tracing::info;

use crate::config::PlaybackConfig;
use crate::error::{Result, VoiceError};

pub struct Player {
    command: Option<String>,
}

impl Player {
    pub fn new(config: &PlaybackConfig) -> Self {
        let command = config.command.trim();
        Self {
            command: (!command.is_empty()).then(|| command.to_string()),
        }
    }

    /// Play `path` to completion.
    pub async fn play(&self, path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(VoiceError::NothingToPlay);
        }
        info!("Playing: {}", path.display());

        match &self.command {
            Some(command) => play_external(command, path).await,
            None => {
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || play_rodio(&path))
                    .await
                    .map_err(|e| VoiceError::Playback(format!("playback task failed: {e}")))?
            }
        }
    }
}

async fn play_external(command: &str, path: &Path) -> Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| VoiceError::Playback("empty player command".into()))?;

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .await
        .map_err(|e| VoiceError::Playback(format!("failed to run {program}: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(VoiceError::Playback(format!("{program} exited with {status}")))
    }
}

fn play_rodio(path: &Path) -> Result<()> {
    let stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| VoiceError::Playback(format!("failed to open audio output: {e}")))?;
    let sink = Sink::connect_new(stream.mixer());

    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| VoiceError::Playback(format!("cannot decode {}: {e}", path.display())))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_nothing_to_play() {
        let player = Player::new(&PlaybackConfig::default());
        let err = player.play(Path::new("/nonexistent/out.wav")).await.unwrap_err();
        assert!(matches!(err, VoiceError::NothingToPlay));
    }

    #[tokio::test]
    async fn external_command_receives_path() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("out.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let player = Player::new(&PlaybackConfig { command: "true".into() });
        player.play(&audio).await.unwrap();

        let player = Player::new(&PlaybackConfig { command: "false".into() });
        assert!(matches!(player.play(&audio).await, Err(VoiceError::Playback(_))));
    }
}

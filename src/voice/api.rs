//! HTTP API server for mixvoice.
//!
//! Exposes the orchestrator to local tools (goal trackers, hooks, scripts).
//! Runs on 127.0.0.1, port 8768 by default, using axum.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::orchestrator::VoiceOrchestrator;
use super::profile::VoiceListing;
use super::script::ScriptClass;

#[derive(Clone)]
pub struct ApiState {
    pub voice: Arc<VoiceOrchestrator>,
}

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    #[serde(default)]
    pub mixed: bool,
    #[serde(default)]
    pub class: Option<ScriptClass>,
    #[serde(default)]
    pub play: bool,
}

#[derive(Deserialize)]
pub struct SetVoiceRequest {
    pub reference: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub model_loaded: bool,
    pub reference_audio: Option<PathBuf>,
    pub last_output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SimpleResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimpleResponse {
    fn ok() -> Self {
        Self {
            status: "ok".into(),
            output: None,
            reference: None,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
            ..Self::ok()
        }
    }
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/voices", get(handle_voices))
        .route("/speak", post(handle_speak))
        .route("/set-voice", post(handle_set_voice))
        .with_state(state)
}

/// Serve the API until the listener fails.
pub async fn serve(state: ApiState, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("mixvoice API listening on {addr}");

    axum::serve(listener, app).await
}

// --- Handlers ---

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let profile = state.voice.profile();
    Json(StatusResponse {
        model_loaded: profile.is_loaded(),
        reference_audio: profile.reference_audio(),
        last_output: state.voice.last_output(),
    })
}

pub async fn handle_voices(State(state): State<ApiState>) -> Json<VoiceListing> {
    Json(state.voice.list_voices())
}

pub async fn handle_speak(
    State(state): State<ApiState>,
    Json(req): Json<SpeakRequest>,
) -> Json<SimpleResponse> {
    if req.text.trim().is_empty() {
        return Json(SimpleResponse::err("empty text"));
    }

    let preview = super::preview(&req.text.replace('\n', " "));
    info!(
        "HTTP /speak: \"{preview}\" ({} chars, mixed={}, class={:?})",
        req.text.chars().count(),
        req.mixed,
        req.class,
    );

    let result = match (req.class, req.mixed) {
        (Some(class), _) => state.voice.speak_as(&req.text, class, None).await,
        (None, true) => state.voice.speak_mixed(&req.text, None).await,
        (None, false) => state.voice.speak(&req.text, None).await,
    };

    let output = match result {
        Ok(path) => path,
        Err(e) => return Json(SimpleResponse::err(e.to_string())),
    };

    if req.play {
        let voice = state.voice.clone();
        let path = output.clone();
        tokio::spawn(async move {
            if let Err(e) = voice.play(Some(&path)).await {
                warn!("Playback failed: {e}");
            }
        });
    }

    Json(SimpleResponse {
        output: Some(output),
        ..SimpleResponse::ok()
    })
}

pub async fn handle_set_voice(
    State(state): State<ApiState>,
    Json(req): Json<SetVoiceRequest>,
) -> Json<SimpleResponse> {
    match state.voice.set_reference_voice(&req.reference).await {
        Ok(()) => Json(SimpleResponse {
            reference: Some(req.reference),
            ..SimpleResponse::ok()
        }),
        Err(e) => Json(SimpleResponse::err(e.to_string())),
    }
}

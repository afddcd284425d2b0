//! services/api/src/web/voice.rs
//!
//! HTTP endpoints for the voice assistant.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use smartstudy_core::domain::SpeechOptions;
use smartstudy_core::ports::PortError;
use smartstudy_core::voice::{VoiceCommandResult, VoiceContext, VoiceQuiz, VoiceStatus};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::HttpError;
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct VoiceCommandRequest {
    pub command: Option<String>,
    /// `{ userLevel, subject, previousContext }`, all optional.
    #[schema(value_type = Object)]
    pub context: Option<VoiceContext>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct SynthesizeRequest {
    pub text: Option<String>,
    /// `{ voice, speed, pitch, volume, emotion, language }`, all optional.
    #[schema(value_type = Object)]
    pub options: Option<SpeechOptions>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct VoiceQuizRequest {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<u32>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: VoiceStatus,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub message: String,
    pub result: VoiceCommandResult,
}

#[derive(Serialize)]
pub struct VoiceQuizResponse {
    pub message: String,
    pub result: VoiceQuiz,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Report the voice assistant's configuration.
#[utoipa::path(
    get,
    path = "/api/voice/status",
    responses((status = 200, description = "Voice assistant status retrieved"))
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Voice assistant status retrieved".to_string(),
        status: state.voice.status(),
    })
}

/// Answer a spoken command and synthesize the reply.
///
/// The caller's profile grade and subject take precedence over the request
/// context.
#[utoipa::path(
    post,
    path = "/api/voice/command",
    request_body = VoiceCommandRequest,
    responses(
        (status = 200, description = "Voice command processed successfully"),
        (status = 400, description = "Voice command is required"),
        (status = 500, description = "Failed to process voice command")
    ),
    security(("bearer" = []))
)]
pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<VoiceCommandRequest>,
) -> Result<Json<CommandResponse>, HttpError> {
    let command =
        present(req.command).ok_or_else(|| HttpError::bad_request("Voice command is required"))?;

    let mut context = req.context.unwrap_or_default();
    match state.profiles.get_profile(user.uid()).await {
        Ok(profile) => {
            if let Some(grade) = present(Some(profile.grade)) {
                context.user_level = Some(grade);
            }
            if let Some(subject) = present(Some(profile.subject)) {
                context.subject = Some(subject);
            }
        }
        Err(e) => warn!("No profile for voice command caller {}: {}", user.uid(), e),
    }

    let result = state
        .voice
        .process_voice_command(&command, &context)
        .await
        .map_err(|e| {
            error!("Voice command error: {}", e);
            HttpError::internal("Failed to process voice command")
        })?;

    Ok(Json(CommandResponse {
        message: "Voice command processed successfully".to_string(),
        result,
    }))
}

/// Synthesize text and return the raw WAV audio.
#[utoipa::path(
    post,
    path = "/api/voice/synthesize",
    request_body = SynthesizeRequest,
    responses(
        (status = 200, description = "Raw audio/wav bytes with an X-Audio-Duration header"),
        (status = 400, description = "Text is required for speech synthesis"),
        (status = 500, description = "The synthesis provider's error")
    ),
    security(("bearer" = []))
)]
pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SynthesizeRequest>,
) -> Result<Response, HttpError> {
    let text = present(req.text)
        .ok_or_else(|| HttpError::bad_request("Text is required for speech synthesis"))?;
    let options = req.options.unwrap_or_default();

    let speech = state
        .voice
        .synthesize_speech(&text, &options)
        .await
        .map_err(|e| {
            error!("Speech synthesis error: {}", e);
            HttpError::internal(e.to_string())
        })?;

    let duration = speech
        .duration
        .as_deref()
        .and_then(|d| HeaderValue::from_str(d).ok())
        .unwrap_or_else(|| HeaderValue::from_static("0"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
            (header::HeaderName::from_static("x-audio-duration"), duration),
        ],
        speech.audio,
    )
        .into_response())
}

/// Generate spoken question/answer pairs on a topic.
#[utoipa::path(
    post,
    path = "/api/voice/quiz",
    request_body = VoiceQuizRequest,
    responses(
        (status = 200, description = "Voice quiz generated successfully"),
        (status = 400, description = "Topic is required for voice quiz"),
        (status = 500, description = "Failed to generate voice quiz")
    ),
    security(("bearer" = []))
)]
pub async fn quiz_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VoiceQuizRequest>,
) -> Result<Json<VoiceQuizResponse>, HttpError> {
    let topic = present(req.topic)
        .ok_or_else(|| HttpError::bad_request("Topic is required for voice quiz"))?;

    let result = state
        .voice
        .generate_voice_quiz(&topic, req.difficulty.as_deref(), req.count)
        .await
        .map_err(|e| {
            error!("Voice quiz error: {}", e);
            match e {
                PortError::Validation(message) => HttpError::bad_request(message),
                _ => HttpError::internal("Failed to generate voice quiz"),
            }
        })?;

    Ok(Json(VoiceQuizResponse {
        message: "Voice quiz generated successfully".to_string(),
        result,
    }))
}

//! services/api/src/web/ws_handler.rs
//!
//! The realtime voice channel. A client opens a WebSocket at `/` and exchanges
//! tagged JSON frames; each inbound frame is routed through a registry of
//! handlers and answered with exactly one outbound frame.

use crate::web::{
    protocol::{
        ClientEnvelope, GenerateVoiceQuizPayload, ServerMessage, SpeechRecognitionPayload,
        VoiceCommandPayload, UNKNOWN_MESSAGE_TYPE,
    },
    rest::route_not_found,
    state::AppState,
};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Response},
};
use futures::{future::BoxFuture, SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use smartstudy_core::ports::{PortError, PortResult};
use std::sync::Arc;
use tracing::{error, info, warn};

//=========================================================================================
// Handler Registry
//=========================================================================================

type Handler = for<'a> fn(&'a AppState, Value) -> BoxFuture<'a, PortResult<Value>>;

/// One routable message kind.
pub struct Route {
    pub kind: &'static str,
    pub result_kind: &'static str,
    handler: Handler,
}

pub static ROUTES: [Route; 3] = [
    Route {
        kind: "voice_command",
        result_kind: "voice_response",
        handler: voice_command,
    },
    Route {
        kind: "speech_recognition",
        result_kind: "recognition_result",
        handler: speech_recognition,
    },
    Route {
        kind: "generate_voice_quiz",
        result_kind: "voice_quiz",
        handler: generate_voice_quiz,
    },
];

fn payload<T: DeserializeOwned>(payload: Value) -> PortResult<T> {
    serde_json::from_value(payload).map_err(|e| PortError::Validation(e.to_string()))
}

fn to_data<T: serde::Serialize>(result: T) -> PortResult<Value> {
    serde_json::to_value(result).map_err(|e| PortError::Unexpected(e.to_string()))
}

fn voice_command(state: &AppState, raw: Value) -> BoxFuture<'_, PortResult<Value>> {
    Box::pin(async move {
        let p: VoiceCommandPayload = payload(raw)?;
        let context = p.context.unwrap_or_default();
        let result = state
            .voice
            .process_voice_command(p.command.as_deref().unwrap_or_default(), &context)
            .await?;
        to_data(result)
    })
}

fn speech_recognition(state: &AppState, raw: Value) -> BoxFuture<'_, PortResult<Value>> {
    Box::pin(async move {
        let p: SpeechRecognitionPayload = payload(raw)?;
        let options = p.options.unwrap_or_default();
        let result = state
            .voice
            .recognize_speech(p.audio.as_deref().unwrap_or_default(), &options)
            .await?;
        to_data(result)
    })
}

fn generate_voice_quiz(state: &AppState, raw: Value) -> BoxFuture<'_, PortResult<Value>> {
    Box::pin(async move {
        let p: GenerateVoiceQuizPayload = payload(raw)?;
        let result = state
            .voice
            .generate_voice_quiz(
                p.topic.as_deref().unwrap_or_default(),
                p.difficulty.as_deref(),
                p.count,
            )
            .await?;
        to_data(result)
    })
}

/// Routes one inbound text frame and returns the frame to send back.
pub async fn dispatch(state: &AppState, text: &str) -> ServerMessage {
    let envelope: ClientEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Malformed realtime message: {}", e);
            return ServerMessage::error(e.to_string());
        }
    };

    let Some(route) = ROUTES.iter().find(|r| r.kind == envelope.kind) else {
        warn!("Unknown realtime message type: {}", envelope.kind);
        return ServerMessage::error(UNKNOWN_MESSAGE_TYPE);
    };

    match (route.handler)(state, Value::Object(envelope.payload)).await {
        Ok(data) => ServerMessage::result(route.result_kind, data),
        Err(e) => {
            error!("Realtime {} failed: {}", route.kind, e);
            ServerMessage::error(e.to_string())
        }
    }
}

//=========================================================================================
// Connection Handling
//=========================================================================================

/// `GET /`: upgrades to the realtime channel when it is enabled and requested,
/// otherwise serves the static `index.html`.
pub async fn root_handler(
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let (true, Ok(ws)) = (state.voice_realtime, ws) {
        return ws.on_upgrade(move |socket| handle_socket(socket, state));
    }

    let index = state.config.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            route_not_found().await.into_response()
        }
        Err(e) => {
            error!("Failed to serve index.html: {}", e);
            crate::error::HttpError::internal("Something went wrong!").into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Voice WebSocket client connected");
    let (mut sender, mut receiver) = socket.split();

    // Frames are answered one at a time, in arrival order.
    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        let reply = dispatch(&state, text.as_str()).await;
        let frame = match serde_json::to_string(&reply) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize realtime reply: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(frame.into())).await.is_err() {
            warn!("Failed to send realtime reply; client went away");
            break;
        }
    }

    info!("Voice WebSocket client disconnected");
}

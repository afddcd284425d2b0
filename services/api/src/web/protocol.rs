//! services/api/src/web/protocol.rs
//!
//! Defines the realtime voice protocol spoken over the WebSocket at `/`.
//!
//! Every inbound text frame is a JSON object tagged by `type`, with the
//! remaining fields forming that kind's payload. Every outbound frame is
//! either `{ "type": <result kind>, "data": .. }` or
//! `{ "type": "error", "error": .. }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smartstudy_core::domain::RecognitionOptions;
use smartstudy_core::voice::VoiceContext;

pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// An inbound frame before its payload is interpreted.
#[derive(Deserialize, Debug)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Payload of `voice_command`.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct VoiceCommandPayload {
    pub command: Option<String>,
    pub context: Option<VoiceContext>,
}

/// Payload of `speech_recognition`. `audio` is base64.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SpeechRecognitionPayload {
    pub audio: Option<String>,
    pub options: Option<RecognitionOptions>,
}

/// Payload of `generate_voice_quiz`.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct GenerateVoiceQuizPayload {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<u32>,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ServerMessage {
    Result {
        #[serde(rename = "type")]
        kind: &'static str,
        data: Value,
    },
    Error {
        #[serde(rename = "type")]
        kind: &'static str,
        error: String,
    },
}

impl ServerMessage {
    pub fn result(kind: &'static str, data: Value) -> Self {
        Self::Result { kind, data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            kind: "error",
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_keeps_the_remaining_fields_as_payload() {
        let envelope: ClientEnvelope = serde_json::from_str(
            r#"{"type":"voice_command","command":"hi","context":{"userLevel":"kid"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind, "voice_command");
        assert_eq!(envelope.payload.get("command"), Some(&json!("hi")));
        assert!(!envelope.payload.contains_key("type"));

        let payload: VoiceCommandPayload =
            serde_json::from_value(Value::Object(envelope.payload)).unwrap();
        assert_eq!(payload.command.as_deref(), Some("hi"));
        assert_eq!(payload.context.unwrap().user_level.as_deref(), Some("kid"));
    }

    #[test]
    fn unknown_type_frame_is_exact() {
        let frame = serde_json::to_string(&ServerMessage::error(UNKNOWN_MESSAGE_TYPE)).unwrap();
        assert_eq!(frame, r#"{"type":"error","error":"Unknown message type"}"#);
    }

    #[test]
    fn result_frames_wrap_data() {
        let frame = serde_json::to_value(ServerMessage::result("voice_quiz", json!({"a": 1}))).unwrap();
        assert_eq!(frame, json!({"type": "voice_quiz", "data": {"a": 1}}));
    }
}

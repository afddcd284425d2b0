//! services/api/src/adapters/speech.rs
//!
//! This module contains the adapter for the voice provider's speech endpoints.
//! It implements the `SpeechSynthesisService` and `SpeechRecognitionService`
//! ports from the `core` crate, and the startup health probe.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use smartstudy_core::domain::{
    RecognitionOptions, RecognitionResult, SpeechOptions, SynthesizedSpeech,
};
use smartstudy_core::ports::{
    PortError, PortResult, SpeechRecognitionService, SpeechSynthesisService,
};
use tracing::error;

use crate::adapters::http::{client, transport_error};
use crate::config::OmniDimConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const AUDIO_DURATION_HEADER: &str = "x-audio-duration";

#[derive(Deserialize)]
struct RecognizePayload {
    #[serde(default)]
    text: String,
    confidence: Option<f64>,
    language: Option<String>,
    #[serde(default)]
    interim: bool,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OmniDimSpeechAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    voice_model: String,
}

impl OmniDimSpeechAdapter {
    pub fn new(config: &OmniDimConfig) -> PortResult<Self> {
        Ok(Self {
            http: client(Some(REQUEST_TIMEOUT))?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            voice_model: config.voice_model.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// `GET {base}/health`. Any non-success status counts as unhealthy.
    pub async fn health_check(&self) -> PortResult<()> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await.map(|_| ())
    }
}

/// Turns a non-2xx response into an upstream error carrying the body text.
async fn check_status(response: reqwest::Response) -> PortResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        format!("Voice provider returned {}", status)
    } else {
        format!("Voice provider returned {}: {}", status, body)
    };
    Err(PortError::Upstream(message))
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl SpeechSynthesisService for OmniDimSpeechAdapter {
    async fn synthesize(
        &self,
        text: &str,
        options: &SpeechOptions,
    ) -> PortResult<SynthesizedSpeech> {
        let body = json!({
            "text": text,
            "config": {
                "voice": options.voice,
                "speed": options.speed,
                "pitch": options.pitch,
                "volume": options.volume,
                "emotion": options.emotion,
                "language": options.language,
                "model": self.voice_model,
            }
        });

        let response = self
            .post("/speech/synthesize")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await.map_err(|e| {
            error!("Speech synthesis error: {}", e);
            e
        })?;

        let duration = response
            .headers()
            .get(AUDIO_DURATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let audio = response.bytes().await.map_err(transport_error)?;

        Ok(SynthesizedSpeech {
            audio: audio.to_vec(),
            format: "wav".to_string(),
            duration,
        })
    }
}

#[async_trait]
impl SpeechRecognitionService for OmniDimSpeechAdapter {
    async fn recognize(
        &self,
        audio: &str,
        options: &RecognitionOptions,
    ) -> PortResult<RecognitionResult> {
        let body = json!({
            "audio": audio,
            "config": {
                "language": options.language,
                "interim_results": options.interim_results,
                "continuous": options.continuous,
                "timeout": options.timeout,
                "model": self.model,
            }
        });

        let response = self
            .post("/speech/recognize")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await.map_err(|e| {
            error!("Speech recognition error: {}", e);
            e
        })?;

        let payload: RecognizePayload = response.json().await.map_err(transport_error)?;
        Ok(RecognitionResult {
            success: true,
            text: payload.text,
            confidence: payload.confidence,
            language: payload.language,
            interim: payload.interim,
            error: None,
        })
    }
}

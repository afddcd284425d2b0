//! Shared harness for the service integration tests: stub voice adapters and
//! an in-process router over the local identity provider.

#![allow(dead_code)]

use api_lib::{
    adapters::{LocalIdentityAdapter, MemoryStore, StubTutorAdapter},
    config::Config,
    web::{build_router, AppState, Ports},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use smartstudy_core::domain::{
    RecognitionOptions, RecognitionResult, SpeechOptions, SynthesizedSpeech,
};
use smartstudy_core::ports::{
    CompletionRequest, CompletionService, PortResult, SpeechRecognitionService,
    SpeechSynthesisService,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub const QUIZ_COMPLETION: &str =
    "Question: What is 2+2? Answer: 4\nQuestion: Capital of France?\nAnswer: Paris";

/// Replies to every prompt with a fixed text.
pub struct CannedCompletion(pub String);

#[async_trait]
impl CompletionService for CannedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> PortResult<String> {
        Ok(self.0.clone())
    }
}

/// Returns the text's bytes as "audio".
pub struct EchoSpeech;

#[async_trait]
impl SpeechSynthesisService for EchoSpeech {
    async fn synthesize(
        &self,
        text: &str,
        _options: &SpeechOptions,
    ) -> PortResult<SynthesizedSpeech> {
        Ok(SynthesizedSpeech {
            audio: text.as_bytes().to_vec(),
            format: "wav".to_string(),
            duration: Some("1.5".to_string()),
        })
    }
}

#[async_trait]
impl SpeechRecognitionService for EchoSpeech {
    async fn recognize(
        &self,
        _audio: &str,
        options: &RecognitionOptions,
    ) -> PortResult<RecognitionResult> {
        Ok(RecognitionResult {
            success: true,
            text: "hello".to_string(),
            confidence: Some(0.9),
            language: options.language.clone(),
            interim: false,
            error: None,
        })
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub upload_dir: PathBuf,
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("smartstudy-{}-{}", name, uuid::Uuid::new_v4().simple()))
}

/// Builds the full router with in-memory adapters and the given completion text.
pub fn test_app_with(completion: &str) -> TestApp {
    test_app_configured(completion, &[], false)
}

/// Like `test_app_with`, with extra environment variables and the realtime
/// channel switch.
pub fn test_app_configured(
    completion: &str,
    env: &[(&'static str, &str)],
    voice_realtime: bool,
) -> TestApp {
    let upload_dir = scratch_dir("uploads");
    let static_dir = scratch_dir("public");
    let mut vars: HashMap<&str, String> = HashMap::from([
        ("UPLOAD_DIR", upload_dir.to_string_lossy().into_owned()),
        ("STATIC_DIR", static_dir.to_string_lossy().into_owned()),
    ]);
    vars.extend(env.iter().map(|(key, value)| (*key, value.to_string())));
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let store = Arc::new(MemoryStore::new());
    let speech = Arc::new(EchoSpeech);
    let ports = Ports {
        store: store.clone(),
        profiles: store,
        identity: Arc::new(LocalIdentityAdapter::new()),
        tutor: Arc::new(StubTutorAdapter::seeded(7)),
        completion: Arc::new(CannedCompletion(completion.to_string())),
        synthesis: speech.clone(),
        recognition: speech,
    };
    let state = Arc::new(AppState::new(Arc::new(config), ports, voice_realtime));
    let router = build_router(state.clone()).unwrap();
    TestApp {
        state,
        router,
        upload_dir,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(QUIZ_COMPLETION)
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Registers a student and returns their bearer token.
    pub async fn signup(&self, username: &str, email: &str) -> String {
        let (status, body) = self
            .post_json(
                "/api/auth/signup",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": "secret123",
                    "grade": "9",
                    "subject": "math"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

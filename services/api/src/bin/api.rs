//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        FirebaseIdentityAdapter, LocalIdentityAdapter, MemoryStore, OmniDimCompletionAdapter,
        OmniDimSpeechAdapter, StubTutorAdapter,
    },
    config::Config,
    error::ApiError,
    web::{build_router, AppState, Ports},
};
use smartstudy_core::ports::IdentityProvider;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Identity Provider ---
    let identity: Arc<dyn IdentityProvider> = match &config.firebase {
        Some(firebase) => {
            info!("Using Firebase identity for project {}", firebase.project_id);
            Arc::new(FirebaseIdentityAdapter::new(firebase.clone())?)
        }
        None => {
            warn!("Firebase is not configured; using the local in-memory identity provider");
            Arc::new(LocalIdentityAdapter::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let store = Arc::new(MemoryStore::new());
    let completion = Arc::new(OmniDimCompletionAdapter::from_config(&config.omnidim));
    let speech = Arc::new(OmniDimSpeechAdapter::new(&config.omnidim)?);

    // --- 4. Probe the Voice Provider ---
    let voice_realtime = if config.voice.enabled && config.omnidim.api_key.is_some() {
        match speech.health_check().await {
            Ok(()) => {
                info!("Voice assistant initialized; realtime channel mounted at /");
                true
            }
            Err(e) => {
                warn!("Voice provider health check failed: {}", e);
                false
            }
        }
    } else {
        info!("Voice assistant disabled or missing an API key");
        false
    };

    // --- 5. Build the Shared AppState and Router ---
    let ports = Ports {
        store: store.clone(),
        profiles: store,
        identity,
        tutor: Arc::new(StubTutorAdapter::new()),
        completion,
        synthesis: speech.clone(),
        recognition: speech,
    };
    let app_state = Arc::new(AppState::new(config.clone(), ports, voice_realtime));
    let app = build_router(app_state)?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

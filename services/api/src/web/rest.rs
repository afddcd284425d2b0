//! services/api/src/web/rest.rs
//!
//! Contains the service-level REST handlers (health, not-found) and the master
//! definition for the OpenAPI specification.

use crate::error::HttpError;
use crate::web::{auth, learning, materials, state::AppState, voice};
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smartstudy_core::voice::VoiceStatus;
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

pub const SERVICE_NAME: &str = "SmartStudy Copilot";
pub const SERVICE_VERSION: &str = "2.0.0";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::google_signin_handler,
        auth::reset_password_handler,
        auth::me_handler,
        auth::update_profile_handler,
        auth::signout_handler,
        auth::firebase_config_handler,
        materials::upload_material_handler,
        materials::list_materials_handler,
        learning::explain_handler,
        learning::solve_handler,
        learning::generate_quiz_handler,
        learning::submit_quiz_handler,
        learning::progress_handler,
        learning::parent_update_handler,
        learning::parent_updates_handler,
        voice::status_handler,
        voice::command_handler,
        voice::synthesize_handler,
        voice::quiz_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::GoogleSignInRequest,
            auth::ResetPasswordRequest,
            auth::UpdateProfileRequest,
            auth::UserView,
            auth::AuthResponse,
            auth::UserResponse,
            auth::ProfileResponse,
            auth::MessageResponse,
            materials::MaterialView,
            materials::UploadResponse,
            materials::MaterialsResponse,
            learning::ExplainRequest,
            learning::SolveRequest,
            learning::GenerateQuizRequest,
            learning::SubmitQuizRequest,
            learning::ParentUpdateRequest,
            voice::VoiceCommandRequest,
            voice::SynthesizeRequest,
            voice::VoiceQuizRequest,
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "SmartStudy Copilot API", description = "Tutoring, quizzes, progress tracking and the voice assistant.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since startup.
    pub uptime: f64,
    pub version: String,
    pub service: String,
    #[schema(value_type = Object)]
    pub voice_assistant: VoiceStatus,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Report liveness, uptime and the voice assistant's status.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "The service is healthy", body = HealthResponse))
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        version: SERVICE_VERSION.to_string(),
        service: SERVICE_NAME.to_string(),
        voice_assistant: state.voice.status(),
    })
}

/// The final fallback for unmatched requests.
pub async fn route_not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Route not found")
}

/// Answers handler panics the same way as other unexpected errors.
pub fn panic_response(
    _panic: Box<dyn std::any::Any + Send + 'static>,
) -> axum::response::Response {
    axum::response::IntoResponse::into_response(HttpError::internal("Something went wrong!"))
}

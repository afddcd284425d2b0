//! services/api/src/web/router.rs
//!
//! Assembles the full HTTP application: public and protected API routes, the
//! realtime channel at `/`, static files, uploads and Swagger UI.

use crate::error::ApiError;
use crate::web::{
    auth, learning, materials,
    middleware::require_auth,
    rest::{self, health_handler, route_not_found, ApiDoc},
    state::AppState,
    voice,
    ws_handler::root_handler,
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    handler::HandlerWithoutStateExt,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Multipart framing on top of the file itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, ApiError> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    };
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", origin, e)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]))
}

/// Builds the application router over the shared state.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let config = state.config.clone();

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/google", post(auth::google_signin_handler))
        .route("/api/auth/reset-password", post(auth::reset_password_handler))
        .route("/api/auth/firebase-config", get(auth::firebase_config_handler))
        .route("/api/voice/status", get(voice::status_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/profile", put(auth::update_profile_handler))
        .route("/api/auth/signout", post(auth::signout_handler))
        .route("/api/materials/upload", post(materials::upload_material_handler))
        .route("/api/materials", get(materials::list_materials_handler))
        .route("/api/tutor/explain", post(learning::explain_handler))
        .route("/api/tutor/solve", post(learning::solve_handler))
        .route("/api/quiz/generate", post(learning::generate_quiz_handler))
        .route("/api/quiz/submit", post(learning::submit_quiz_handler))
        .route("/api/progress/{student_id}", get(learning::progress_handler))
        .route("/api/parent/update", post(learning::parent_update_handler))
        .route(
            "/api/parent/updates/{student_id}",
            get(learning::parent_updates_handler),
        )
        .route("/api/voice/command", post(voice::command_handler))
        .route("/api/voice/synthesize", post(voice::synthesize_handler))
        .route("/api/voice/quiz", post(voice::quiz_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Everything else is a static file or a JSON 404.
    let static_files = ServeDir::new(&config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(route_not_found.into_service());

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + BODY_LIMIT_SLACK))
        .layer(cors_layer(config.cors_origin.as_deref())?)
        .layer(trace_layer)
        .layer(CatchPanicLayer::custom(rest::panic_response));

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_cors_origin_is_rejected() {
        assert!(cors_layer(Some("bad\norigin")).is_err());
        assert!(cors_layer(Some("http://localhost:3000")).is_ok());
        assert!(cors_layer(None).is_ok());
    }
}

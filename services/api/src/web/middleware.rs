//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use smartstudy_core::domain::IdentityAccount;
use std::sync::Arc;
use tracing::warn;

use crate::error::HttpError;
use crate::web::state::AppState;

/// The caller behind a verified bearer token, available to protected handlers
/// as `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account: IdentityAccount,
    pub token: String,
}

impl AuthUser {
    pub fn uid(&self) -> &str {
        &self.account.uid
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Middleware that validates the bearer token and attaches the caller.
///
/// A missing token is answered with 401, a token the identity provider rejects
/// with 403.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract the bearer token
    let Some(token) = bearer_token(&req) else {
        return HttpError::new(StatusCode::UNAUTHORIZED, "Access token required").into_response();
    };

    // 2. Ask the identity provider who it belongs to
    let account = match state.identity.verify_token(&token).await {
        Ok(account) => account,
        Err(e) => {
            warn!("Rejected bearer token: {}", e);
            return HttpError::new(StatusCode::FORBIDDEN, "Invalid token").into_response();
        }
    };

    // 3. Insert the caller into request extensions and continue
    req.extensions_mut().insert(AuthUser { account, token });
    next.run(req).await
}

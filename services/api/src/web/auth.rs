//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup, login, Google sign-in, password reset,
//! the caller's profile, sign-out and the browser's Firebase configuration.
//!
//! Each flow is a short pipeline of typed stages that return `PortResult`, so a
//! failure at any stage stops the flow before later side effects run.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use smartstudy_core::domain::{IdentitySession, ProfileUpdate, Role, UserProfile};
use smartstudy_core::ports::{PortError, PortResult, ProfileStore};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
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
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleSignInRequest {
    pub id_token: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// The public view of a user profile.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: String,
    pub grade: String,
    pub subject: String,
    pub email_verified: bool,
}

impl From<&UserProfile> for UserView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            photo_url: profile.photo_url.clone(),
            role: profile.role.to_string(),
            grade: profile.grade.clone(),
            subject: profile.subject.clone(),
            email_verified: profile.email_verified,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserView,
    pub token: String,
    pub provider: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user: UserView,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserView,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

//=========================================================================================
// Pipeline Stages
//=========================================================================================

/// A signup request with every required field present.
struct SignupForm {
    username: String,
    email: String,
    password: String,
    role: Role,
    grade: String,
    subject: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_role(role: Option<String>) -> PortResult<Option<Role>> {
    present(role)
        .map(|r| Role::from_str(&r).map_err(PortError::Validation))
        .transpose()
}

fn validate_signup(req: SignupRequest) -> PortResult<SignupForm> {
    let (Some(username), Some(email), Some(password)) =
        (present(req.username), present(req.email), present(req.password))
    else {
        return Err(PortError::Validation("All fields are required".to_string()));
    };
    Ok(SignupForm {
        username,
        email,
        password,
        role: parse_role(req.role)?.unwrap_or_default(),
        grade: req.grade.unwrap_or_default(),
        subject: req.subject.unwrap_or_default(),
    })
}

fn new_profile(session: &IdentitySession, username: &str) -> UserProfile {
    let now = Utc::now();
    let account = &session.account;
    let display_name = account
        .display_name
        .clone()
        .unwrap_or_else(|| username.to_string());
    UserProfile {
        uid: account.uid.clone(),
        username: username.to_string(),
        email: account.email.clone(),
        display_name,
        role: Role::Student,
        grade: String::new(),
        subject: String::new(),
        photo_url: account.photo_url.clone(),
        email_verified: account.email_verified,
        provider: session.provider.clone(),
        created_at: now,
        last_login_at: now,
    }
}

async fn create_profile_document(
    profiles: &dyn ProfileStore,
    session: &IdentitySession,
    form: &SignupForm,
) -> PortResult<UserProfile> {
    let profile = UserProfile {
        role: form.role,
        grade: form.grade.clone(),
        subject: form.subject.clone(),
        ..new_profile(session, &form.username)
    };
    profiles.create_profile(profile).await
}

/// Loads the caller's profile after a sign-in, creating a default one for
/// accounts that have never been seen by this service, and stamps the login.
async fn load_or_create_profile(
    profiles: &dyn ProfileStore,
    session: &IdentitySession,
) -> PortResult<UserProfile> {
    let account = &session.account;
    match profiles.touch_last_login(&account.uid).await {
        Ok(()) => profiles.get_profile(&account.uid).await,
        Err(PortError::NotFound(_)) => {
            let fallback_name = account
                .display_name
                .clone()
                .unwrap_or_else(|| account.email.split('@').next().unwrap_or_default().to_string());
            profiles
                .create_profile(new_profile(session, &fallback_name))
                .await
        }
        Err(e) => Err(e),
    }
}

/// Copies the Google account's display name and photo onto an existing profile.
async fn refresh_from_google(
    profiles: &dyn ProfileStore,
    session: &IdentitySession,
    profile: UserProfile,
) -> PortResult<UserProfile> {
    let refresh = ProfileUpdate {
        display_name: session.account.display_name.clone(),
        photo_url: session.account.photo_url.clone(),
        ..ProfileUpdate::default()
    };
    if refresh.is_empty() {
        return Ok(profile);
    }
    profiles.update_profile(&profile.uid, &refresh).await
}

fn auth_response(message: &str, profile: &UserProfile, session: IdentitySession) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: UserView::from(profile),
        token: session.token,
        provider: session.provider,
    }
}

fn log_failure(flow: &str) -> impl Fn(PortError) -> HttpError + '_ {
    move |e| {
        error!("{} failed: {}", flow, e);
        HttpError::from(e)
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new account and its profile document
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Missing fields or rejected by the identity provider")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let form = validate_signup(req)?;

    let result = async {
        let session = state
            .identity
            .sign_up(&form.email, &form.password, &form.username)
            .await?;
        let profile = create_profile_document(state.profiles.as_ref(), &session, &form).await?;
        Ok::<_, PortError>((profile, session))
    }
    .await;

    let (profile, session) = result.map_err(|e| {
        error!("Signup failed: {}", e);
        match e {
            // Any provider rejection is a client error here.
            PortError::Upstream(message) | PortError::Unauthorized(message) => {
                HttpError::bad_request(message)
            }
            other => HttpError::from(other),
        }
    })?;

    info!("Registered user {}", profile.uid);
    Ok((
        StatusCode::CREATED,
        Json(auth_response("User registered successfully", &profile, session)),
    ))
}

/// POST /api/auth/login - Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, HttpError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(HttpError::bad_request("Email and password are required"));
    };

    let session = state
        .identity
        .sign_in(&email, &password)
        .await
        .map_err(|e| match e {
            PortError::Validation(message) => HttpError::new(StatusCode::UNAUTHORIZED, message),
            other => log_failure("Login")(other),
        })?;
    let profile = load_or_create_profile(state.profiles.as_ref(), &session)
        .await
        .map_err(log_failure("Login"))?;

    Ok(Json(auth_response("Login successful", &profile, session)))
}

/// POST /api/auth/google - Exchange a Google ID token for a session
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleSignInRequest,
    responses(
        (status = 200, description = "Google sign-in successful", body = AuthResponse),
        (status = 400, description = "ID token missing"),
        (status = 401, description = "Invalid token")
    )
)]
pub async fn google_signin_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GoogleSignInRequest>,
) -> Result<Json<AuthResponse>, HttpError> {
    let id_token = present(req.id_token).ok_or_else(|| HttpError::bad_request("ID token is required"))?;

    let session = state
        .identity
        .sign_in_with_google(&id_token)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized(_) | PortError::Validation(_) => {
                HttpError::new(StatusCode::UNAUTHORIZED, "Invalid token")
            }
            other => log_failure("Google sign-in")(other),
        })?;
    let profile = async {
        let profile = load_or_create_profile(state.profiles.as_ref(), &session).await?;
        refresh_from_google(state.profiles.as_ref(), &session, profile).await
    }
    .await
    .map_err(log_failure("Google sign-in"))?;

    Ok(Json(auth_response("Google sign-in successful", &profile, session)))
}

/// POST /api/auth/reset-password - Send a password reset email
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset email sent", body = MessageResponse),
        (status = 400, description = "Email missing or unknown")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, HttpError> {
    let email = present(req.email).ok_or_else(|| HttpError::bad_request("Email is required"))?;

    state
        .identity
        .send_password_reset(&email)
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    Ok(MessageResponse::new("Password reset email sent successfully"))
}

/// GET /api/auth/me - The caller's profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, HttpError> {
    let profile = state.profiles.get_profile(user.uid()).await?;
    Ok(Json(UserResponse {
        user: UserView::from(&profile),
    }))
}

/// PUT /api/auth/profile - Update the caller's profile; empty fields are ignored
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ProfileResponse),
        (status = 400, description = "Invalid role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, HttpError> {
    let update = ProfileUpdate {
        username: present(req.username),
        display_name: present(req.display_name),
        role: parse_role(req.role)?,
        grade: present(req.grade),
        subject: present(req.subject),
        photo_url: present(req.photo_url),
    };

    let profile = state
        .profiles
        .update_profile(user.uid(), &update)
        .await
        .map_err(log_failure("Profile update"))?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserView::from(&profile),
    }))
}

/// POST /api/auth/signout - End the caller's session
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 200, description = "Signed out successfully", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn signout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>, HttpError> {
    state.identity.sign_out(&user.token).await?;
    Ok(MessageResponse::new("Signed out successfully"))
}

/// GET /api/auth/firebase-config - Client configuration for the Firebase SDK
#[utoipa::path(
    get,
    path = "/api/auth/firebase-config",
    responses(
        (status = 200, description = "Firebase client configuration"),
        (status = 500, description = "Firebase not initialized")
    )
)]
pub async fn firebase_config_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let config = state
        .identity
        .client_config()
        .ok_or_else(|| HttpError::internal("Firebase not initialized"))?;
    Ok(Json(serde_json::json!({ "config": config })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_requires_username_email_and_password() {
        let missing = SignupRequest {
            username: Some("sam".to_string()),
            email: Some("  ".to_string()),
            password: Some("secret1".to_string()),
            ..SignupRequest::default()
        };
        assert!(matches!(validate_signup(missing), Err(PortError::Validation(ref m)) if m == "All fields are required"));

        let form = validate_signup(SignupRequest {
            username: Some("sam".to_string()),
            email: Some("sam@example.com".to_string()),
            password: Some("secret1".to_string()),
            role: Some("Teacher".to_string()),
            ..SignupRequest::default()
        })
        .unwrap();
        assert_eq!(form.role, Role::Teacher);
        assert_eq!(form.grade, "");
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(parse_role(Some("admin".to_string())).is_err());
        assert_eq!(parse_role(Some(String::new())).unwrap(), None);
    }
}

//! services/api/src/adapters/identity_firebase.rs
//!
//! Identity provider backed by the Firebase Identity Toolkit REST API. The
//! bearer token handed to clients is the Firebase ID token, and verification
//! asks Firebase to look the token up.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use smartstudy_core::domain::{IdentityAccount, IdentitySession};
use smartstudy_core::ports::{FirebaseClientConfig, IdentityProvider, PortError, PortResult};
use tracing::{info, warn};

use crate::adapters::http::{client, transport_error};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Firebase error codes that mean the caller's credentials or token were rejected.
const UNAUTHORIZED_CODES: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "USER_DISABLED",
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "USER_NOT_FOUND",
    "INVALID_IDP_RESPONSE",
];

//=========================================================================================
// Identity Toolkit Payloads
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Deserialize)]
struct LookupPayload {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turns a Firebase error message such as `WEAK_PASSWORD : Password should be
/// at least 6 characters` into a port error.
fn map_firebase_error(message: &str) -> PortError {
    let code = message.split(':').next().unwrap_or(message).trim();
    if UNAUTHORIZED_CODES.contains(&code) {
        PortError::Unauthorized(message.to_string())
    } else {
        PortError::Validation(message.to_string())
    }
}

/// Records the display name once the provider accepted it. The account already
/// exists at this point, so a failed update only loses the name.
fn with_display_name(
    mut session: IdentitySession,
    display_name: &str,
    outcome: PortResult<()>,
) -> IdentitySession {
    match outcome {
        Ok(()) => session.account.display_name = Some(display_name.to_string()),
        Err(e) => {
            warn!(
                "Could not set display name for {}: {}",
                session.account.uid, e
            );
            session.account.display_name = None;
        }
    }
    session
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct FirebaseIdentityAdapter {
    http: reqwest::Client,
    config: FirebaseClientConfig,
}

impl FirebaseIdentityAdapter {
    pub fn new(config: FirebaseClientConfig) -> PortResult<Self> {
        Ok(Self {
            http: client(Some(REQUEST_TIMEOUT))?,
            config,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> PortResult<T> {
        let url = format!("{}/accounts:{}?key={}", IDENTITY_TOOLKIT_URL, method, self.config.api_key);
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => format!("Identity provider returned {}", status),
            };
            warn!("Identity Toolkit {} failed: {}", method, message);
            return Err(map_firebase_error(&message));
        }

        response.json::<T>().await.map_err(transport_error)
    }

    fn session(payload: AuthPayload, fallback_email: &str, provider: &str) -> IdentitySession {
        IdentitySession {
            account: IdentityAccount {
                uid: payload.local_id,
                email: payload.email.unwrap_or_else(|| fallback_email.to_string()),
                display_name: payload.display_name,
                photo_url: payload.photo_url,
                email_verified: payload.email_verified,
            },
            token: payload.id_token,
            provider: provider.to_string(),
        }
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for FirebaseIdentityAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> PortResult<IdentitySession> {
        let created: AuthPayload = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        // Display name is set in a second call, as the client SDK does.
        let mut session = Self::session(created, email, "email");
        if !display_name.is_empty() {
            let outcome: PortResult<Value> = self
                .call(
                    "update",
                    json!({
                        "idToken": session.token,
                        "displayName": display_name,
                        "returnSecureToken": false
                    }),
                )
                .await;
            session = with_display_name(session, display_name, outcome.map(|_| ()));
        }

        info!("Created Firebase account {}", session.account.uid);
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<IdentitySession> {
        let payload: AuthPayload = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(Self::session(payload, email, "email"))
    }

    async fn sign_in_with_google(&self, id_token: &str) -> PortResult<IdentitySession> {
        let payload: AuthPayload = self
            .call(
                "signInWithIdp",
                json!({
                    "postBody": format!("id_token={}&providerId=google.com", id_token),
                    "requestUri": format!("https://{}", self.config.auth_domain),
                    "returnIdpCredential": true,
                    "returnSecureToken": true
                }),
            )
            .await?;
        Ok(Self::session(payload, "", "google"))
    }

    async fn verify_token(&self, token: &str) -> PortResult<IdentityAccount> {
        let lookup: LookupPayload = self
            .call("lookup", json!({ "idToken": token }))
            .await
            .map_err(|e| match e {
                PortError::Validation(message) => PortError::Unauthorized(message),
                other => other,
            })?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Unauthorized("Invalid token".to_string()))?;

        Ok(IdentityAccount {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
            display_name: user.display_name,
            photo_url: user.photo_url,
            email_verified: user.email_verified,
        })
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        let _: Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    /// ID tokens expire on their own; the client drops its copy.
    async fn sign_out(&self, _token: &str) -> PortResult<()> {
        Ok(())
    }

    fn client_config(&self) -> Option<FirebaseClientConfig> {
        Some(self.config.clone())
    }
}

//! services/api/src/adapters/identity_local.rs
//!
//! A self-contained identity provider used when no Firebase project is
//! configured. Credentials are argon2 hashes and sessions are opaque UUID
//! bearer tokens that expire after 30 days. Everything lives in memory.

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use smartstudy_core::domain::{IdentityAccount, IdentitySession};
use smartstudy_core::ports::{FirebaseClientConfig, IdentityProvider, PortError, PortResult};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

const SESSION_LIFETIME_DAYS: i64 = 30;
const MIN_PASSWORD_LEN: usize = 6;

struct LocalAccount {
    account: IdentityAccount,
    password_hash: String,
}

struct LocalSession {
    email: String,
    expires_at: DateTime<Utc>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Default)]
pub struct LocalIdentityAdapter {
    /// Keyed by lowercased email.
    accounts: RwLock<HashMap<String, LocalAccount>>,
    /// Keyed by bearer token.
    sessions: RwLock<HashMap<String, LocalSession>>,
}

impl LocalIdentityAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open_session(&self, account: IdentityAccount) -> IdentitySession {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);
        self.sessions.write().await.insert(
            token.clone(),
            LocalSession {
                email: account.email.to_lowercase(),
                expires_at,
            },
        );
        IdentitySession {
            account,
            token,
            provider: "email".to_string(),
        }
    }
}

fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, password_hash: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for LocalIdentityAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> PortResult<IdentitySession> {
        if !email.contains('@') {
            return Err(PortError::Validation(
                "The email address is badly formatted.".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(PortError::Validation(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let key = email.to_lowercase();
        let account = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(PortError::Validation(
                    "The email address is already in use by another account.".to_string(),
                ));
            }
            let account = IdentityAccount {
                uid: Uuid::new_v4().simple().to_string(),
                email: email.to_string(),
                display_name: Some(display_name.to_string()).filter(|n| !n.is_empty()),
                photo_url: None,
                email_verified: false,
            };
            accounts.insert(
                key,
                LocalAccount {
                    account: account.clone(),
                    password_hash,
                },
            );
            account
        };

        info!("Created local account {}", account.uid);
        Ok(self.open_session(account).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<IdentitySession> {
        let invalid = || PortError::Unauthorized("Invalid email or password".to_string());

        let (account, password_hash) = {
            let accounts = self.accounts.read().await;
            let stored = accounts.get(&email.to_lowercase()).ok_or_else(invalid)?;
            (stored.account.clone(), stored.password_hash.clone())
        };

        if !verify_password(password, &password_hash)? {
            return Err(invalid());
        }
        Ok(self.open_session(account).await)
    }

    async fn sign_in_with_google(&self, _id_token: &str) -> PortResult<IdentitySession> {
        Err(PortError::Unauthorized(
            "Google sign-in requires Firebase to be configured".to_string(),
        ))
    }

    async fn verify_token(&self, token: &str) -> PortResult<IdentityAccount> {
        let email = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get(token)
                .ok_or_else(|| PortError::Unauthorized("Invalid token".to_string()))?;
            if session.expires_at <= Utc::now() {
                sessions.remove(token);
                return Err(PortError::Unauthorized("Token expired".to_string()));
            }
            session.email.clone()
        };

        self.accounts
            .read()
            .await
            .get(&email)
            .map(|stored| stored.account.clone())
            .ok_or_else(|| PortError::Unauthorized("Invalid token".to_string()))
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        if !self.accounts.read().await.contains_key(&email.to_lowercase()) {
            return Err(PortError::Validation(
                "There is no user record corresponding to this identifier.".to_string(),
            ));
        }
        info!("Password reset requested for a local account; no mail transport is configured");
        Ok(())
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    fn client_config(&self) -> Option<FirebaseClientConfig> {
        None
    }
}

//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use smartstudy_core::ports::FirebaseClientConfig;
use smartstudy_core::voice::VoiceSettings;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection settings for the OmniDimension voice/AI API.
#[derive(Clone, Debug)]
pub struct OmniDimConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice_model: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub omnidim: OmniDimConfig,
    pub voice: VoiceSettings,
    /// `None` selects the local identity provider.
    pub firebase: Option<FirebaseClientConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server Settings ---
        let bind_address_str = var("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let static_dir = PathBuf::from(var("STATIC_DIR", "./public"));
        let upload_dir = PathBuf::from(var("UPLOAD_DIR", "./uploads"));

        let max_upload_str = var("MAX_UPLOAD_BYTES", "10485760");
        let max_upload_bytes = max_upload_str.parse::<usize>().map_err(|e| {
            ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
        })?;

        let cors_origin = lookup("CORS_ORIGIN").filter(|o| !o.trim().is_empty());

        // --- Load Voice Provider Settings ---
        let omnidim = OmniDimConfig {
            api_key: lookup("OMNIDIM_API_KEY").filter(|k| !k.is_empty()),
            base_url: var("OMNIDIM_BASE_URL", "https://api.omnidimension.ai")
                .trim_end_matches('/')
                .to_string(),
            model: var("OMNIDIM_MODEL", "omnidim-1.0"),
            voice_model: var("OMNIDIM_VOICE_MODEL", "omnidim-voice-1.0"),
        };

        let voice = VoiceSettings {
            enabled: lookup("VOICE_ASSISTANT_ENABLED").as_deref() == Some("true"),
            omnidim_enabled: lookup("OMNIDIM_VOICE_ENABLED").as_deref() == Some("true"),
            api_key_configured: omnidim.api_key.is_some(),
            recognition_language: var("VOICE_RECOGNITION_LANGUAGE", "en-US"),
            speech_language: var("VOICE_SPEECH_LANGUAGE", "en-US"),
            persona: var("OMNIDIM_VOICE_PERSONA", "educational"),
            emotion: var("OMNIDIM_VOICE_EMOTION", "neutral"),
            speed: lenient_f64(lookup("OMNIDIM_VOICE_SPEED")),
            pitch: lenient_f64(lookup("OMNIDIM_VOICE_PITCH")),
            volume: lenient_f64(lookup("OMNIDIM_VOICE_VOLUME")),
        };

        // --- Load Identity Provider Settings (all or nothing) ---
        let firebase = match lookup("FIREBASE_API_KEY").filter(|k| !k.is_empty()) {
            None => None,
            Some(api_key) => {
                let required = |key: &str| {
                    lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))
                };
                Some(FirebaseClientConfig {
                    api_key,
                    auth_domain: required("FIREBASE_AUTH_DOMAIN")?,
                    project_id: required("FIREBASE_PROJECT_ID")?,
                    storage_bucket: lookup("FIREBASE_STORAGE_BUCKET").unwrap_or_default(),
                    messaging_sender_id: lookup("FIREBASE_MESSAGING_SENDER_ID")
                        .unwrap_or_default(),
                    app_id: lookup("FIREBASE_APP_ID").unwrap_or_default(),
                })
            }
        };

        Ok(Self {
            bind_address,
            log_level,
            static_dir,
            upload_dir,
            max_upload_bytes,
            cors_origin,
            omnidim,
            voice,
            firebase,
        })
    }
}

/// Voice tuning values fall back to 1.0 when absent or unparsable.
fn lenient_f64(value: Option<String>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| *v != 0.0 && v.is_finite())
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.omnidim.base_url, "https://api.omnidimension.ai");
        assert!(!config.voice.enabled);
        assert!(!config.voice.api_key_configured);
        assert_eq!(config.voice.persona, "educational");
        assert!(config.firebase.is_none());
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn unparsable_voice_tuning_falls_back_to_one() {
        let config = load(&[
            ("OMNIDIM_VOICE_SPEED", "fast"),
            ("OMNIDIM_VOICE_PITCH", "1.25"),
        ])
        .unwrap();
        assert_eq!(config.voice.speed, 1.0);
        assert_eq!(config.voice.pitch, 1.25);
    }

    #[test]
    fn invalid_bind_address_is_rejected() {
        let err = load(&[("BIND_ADDRESS", "not-an-address")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "BIND_ADDRESS"));
    }

    #[test]
    fn partial_firebase_settings_are_rejected() {
        let err = load(&[("FIREBASE_API_KEY", "key")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref key) if key == "FIREBASE_AUTH_DOMAIN"));
    }

    #[test]
    fn voice_flags_require_the_literal_true() {
        let config = load(&[
            ("VOICE_ASSISTANT_ENABLED", "true"),
            ("OMNIDIM_VOICE_ENABLED", "yes"),
            ("OMNIDIM_API_KEY", "secret"),
        ])
        .unwrap();
        assert!(config.voice.enabled);
        assert!(!config.voice.omnidim_enabled);
        assert!(config.voice.api_key_configured);
    }
}

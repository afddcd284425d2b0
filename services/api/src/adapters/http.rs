//! services/api/src/adapters/http.rs
//!
//! Shared HTTP client construction for the adapters that talk to REST providers.

use std::time::Duration;

use smartstudy_core::ports::{PortError, PortResult};

pub fn client(timeout: Option<Duration>) -> PortResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("smartstudy-api/{}", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| PortError::Unexpected(format!("Failed to initialize HTTP client: {}", e)))
}

/// Maps a transport-level failure to an upstream error.
pub fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Upstream(e.to_string())
}

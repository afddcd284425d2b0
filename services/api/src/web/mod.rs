pub mod auth;
pub mod extract;
pub mod learning;
pub mod materials;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod voice;
pub mod ws_handler;

// Re-export the pieces the binaries and integration tests build the server from.
pub use middleware::require_auth;
pub use router::build_router;
pub use state::{AppState, Ports};
pub use ws_handler::dispatch;

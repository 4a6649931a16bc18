//! HTTP server layer
//!
//! Axum server with:
//! - CORS (allow-listed origins by default)
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses
//! - Session cookie / bearer authentication

pub mod cookies;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use extractors::CurrentUser;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};

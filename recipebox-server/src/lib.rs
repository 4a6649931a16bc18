//! recipebox-server: HTTP backend for recipes
//!
//! Users own recipes made of ingredients and ordered instructions, tag
//! them, and upload files. Every recipe mutation is transactional,
//! deadline-bounded, and checked against the recipe owner.
//!
//! Layout:
//! - [`models`]: validated input types
//! - [`db`]: pool, schema, repositories and the recipe mutation core
//! - [`auth`]: password hashing, tokens, session pruning
//! - [`storage`]: object store and signed URLs
//! - [`http`]: axum routes, extractors and error mapping
//! - [`config`]: layered settings

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod storage;

pub use config::{ConfigError, Settings};
pub use http::{build_router, run_server, AppState, ServerConfig};

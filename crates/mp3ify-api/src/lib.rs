//! Axum HTTP/WS API server.
//!
//! This crate provides:
//! - Multipart upload intake feeding the conversion queue
//! - Job status polling and MP3 download delivery
//! - Per-job progress WebSocket
//! - Prometheus metrics and health probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

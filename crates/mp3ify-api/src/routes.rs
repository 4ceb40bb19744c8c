//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::download::download_audio;
use crate::handlers::health::{health, ready, root};
use crate::handlers::status::get_conversion_status;
use crate::handlers::upload::upload_media;
use crate::metrics::metrics_middleware;
use crate::middleware::cors_layer;
use crate::state::AppState;
use crate::ws::ws_progress;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(upload_media))
        .route("/status/:file_id", get(get_conversion_status))
        .route("/download/:file_id", get(download_audio))
        .route("/ws/:file_id", get(ws_progress));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads are large; lift axum's default cap up to the configured
        // limit and enforce that limit for every route.
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(RequestBodyLimitLayer::new(max_file_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

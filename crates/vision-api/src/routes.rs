//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    delete_image, get_attachment, get_status, get_video_summary, health, list_standalone_images, ready,
    reset_image_analysis, start_session, stop_session,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let image_routes = Router::new()
        .route("/images", get(list_standalone_images))
        // Admin
        .route("/images/:image_id", delete(delete_image))
        .route("/images/:image_id/reset", get(reset_image_analysis));

    let video_routes = Router::new().route("/videos/:video_id/summary", get(get_video_summary));

    let session_routes = Router::new()
        .route("/sessions/start", post(start_session))
        .route("/sessions/stop", post(stop_session));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(image_routes)
        .merge(video_routes)
        .merge(session_routes)
        .route("/status", get(get_status))
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    // Attachments are served at the root so image URLs stay short
    let attachment_routes = Router::new().route("/images/:kind/:file", get(get_attachment));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/api", api_routes)
        .merge(attachment_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .fallback_service(static_files)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

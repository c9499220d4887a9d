//! Router configuration for the download endpoint.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{download_file, get_share_info, AppState};

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_routes = Router::new().route("/shares/:id", get(get_share_info));

    Router::new()
        .route("/download/:id", get(download_file))
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

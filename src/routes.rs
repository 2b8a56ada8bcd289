//! Top-level router.
//!
//! # Middleware
//!
//! - **Tracing** - one span per request with status and latency
//! - **Path normalization** - trailing slashes are trimmed

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::api::middleware::tracing;
use crate::state::AppState;

/// All routes with state and tracing applied.
pub fn api_router(state: AppState) -> Router {
    api::routes::routes()
        .with_state(state)
        .layer(tracing::layer())
}

/// The router served by the binary: [`api_router`] behind path normalization.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state))
}

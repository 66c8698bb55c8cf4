//! Liveness probe. Reports that the process is up, nothing more.

use axum::{Router, http::StatusCode, routing::get};

/// Router for the health endpoint
pub fn health_router() -> Router {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

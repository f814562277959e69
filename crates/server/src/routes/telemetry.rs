// crates/server/src/routes/telemetry.rs
//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};

use crate::metrics::render_metrics;
use crate::state::AppState;

/// GET /api/metrics - Prometheus text exposition.
pub async fn metrics_text() -> Result<String, StatusCode> {
    render_metrics().ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Create the telemetry routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_text))
}

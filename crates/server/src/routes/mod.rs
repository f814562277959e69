//! API route handlers for the harborview server.

pub mod clusters;
pub mod health;
pub mod heartbeats;
pub mod hours;
pub mod submissions;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /api/metrics - Prometheus text exposition
/// - GET /api/submissions - List submissions in the review queue
/// - GET /api/submissions/{id} - Submission detail + trust level
/// - POST /api/submissions/{id}/heartbeats/sync - Start heartbeat ingest
/// - GET /api/submissions/{id}/heartbeats/progress - Ingest day counter
/// - GET /api/submissions/{id}/clusters - Work-session clusters
/// - GET /api/submissions/{id}/clusters/{cluster_id}/files - File groups + root
/// - GET /api/submissions/{id}/clusters/{cluster_id}/deltas - Plot series
/// - GET /api/submissions/{id}/clusters/{cluster_id}/frame - Playback frame
/// - GET /api/submissions/{id}/aggregate - Advisory cross-submission hours
/// - POST /api/submissions/{id}/hour-sync - Fuzzy hour-sync with write-back
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", telemetry::router())
        .nest("/api", submissions::router())
        .nest("/api", heartbeats::router())
        .nest("/api", clusters::router())
        .nest("/api", hours::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let state = crate::state::tests::test_state();
        let _router = api_routes(state);
    }
}

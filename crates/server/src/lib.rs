// crates/server/src/lib.rs
//! Harborview server library.
//!
//! Axum-based HTTP backend for the YSWS submission review dashboard: serves
//! the submission queue, drives heartbeat ingestion against the
//! time-tracking admin API, and exposes cluster/file/playback data for the
//! reviewer frontend.

pub mod config;
pub mod error;
pub mod ingest_state;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod sync;

pub use config::ServerConfig;
pub use error::*;
pub use ingest_state::{IngestState, IngestStatus};
pub use metrics::{init_metrics, record_ingest, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// Sets up the API routes, permissive CORS for the dashboard frontend, and
/// request tracing.
pub fn create_app(state: std::sync::Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    fn app() -> Router {
        create_app(crate::state::tests::test_state())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get(app(), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("\"version\""));
        assert!(body.contains("\"uptime_secs\""));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = get(app(), "/api/nonsense").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clusters_before_ingest_is_409() {
        let (status, body) = get(app(), "/api/submissions/rec1/clusters").await;

        assert_eq!(status, StatusCode::CONFLICT);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Heartbeats not ingested yet");
    }

    #[tokio::test]
    async fn test_progress_for_unknown_submission_is_idle() {
        let (status, body) = get(app(), "/api/submissions/recX/heartbeats/progress").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["daysTotal"], 0);
    }

    #[tokio::test]
    async fn test_submissions_list_from_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Submissions")
            .with_status(200)
            .with_body(
                r#"{"records":[
                    {"id":"rec1","fields":{"Project Name":"Weather Wand","Email":"dev@example.com","Approved":true}},
                    {"id":"rec2","fields":{}}
                ]}"#,
            )
            .create_async()
            .await;

        let app = create_app(crate::state::tests::test_state_with(&server.url()));
        let (status, body) = get(app, "/api/submissions").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["projectName"], "Weather Wand");
        assert_eq!(json[0]["approved"], true);
    }

    #[tokio::test]
    async fn test_submission_detail_with_trust_level() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Submissions/rec1")
            .with_status(200)
            .with_body(
                r#"{"id":"rec1","fields":{"Project Name":"Weather Wand","Email":"dev@example.com"}}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/users/lookup_email/dev%40example.com")
            .with_status(200)
            .with_body(r#"{"user":{"id":7}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/7")
            .with_status(200)
            .with_body(r#"{"user":{"id":7,"trust_level":"blue"}}"#)
            .create_async()
            .await;

        let app = create_app(crate::state::tests::test_state_with(&server.url()));
        let (status, body) = get(app, "/api/submissions/rec1").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["submission"]["id"], "rec1");
        assert_eq!(json["trustLevel"], "trusted");
    }

    #[tokio::test]
    async fn test_submission_detail_trust_failure_degrades_to_null() {
        // Submission resolves, but the time-tracking service is down: the
        // detail still renders, with trustLevel null.
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Submissions/rec1")
            .with_status(200)
            .with_body(r#"{"id":"rec1","fields":{"Email":"dev@example.com"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/lookup_email/dev%40example.com")
            .with_status(500)
            .create_async()
            .await;

        let app = create_app(crate::state::tests::test_state_with(&server.url()));
        let (status, body) = get(app, "/api/submissions/rec1").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["trustLevel"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_playback_frame_end_to_end() {
        use crate::state::ReviewSession;
        use chrono::{TimeZone, Utc};
        use harborview_core::{cluster, Heartbeat};

        let mut server = mockito::Server::new_async().await;
        let source: String = (1..=40).map(|i| format!("line {i}\n")).collect();
        server
            .mock("GET", "/dev/weather-wand/main/main.rs")
            .with_status(200)
            .with_body(source)
            .create_async()
            .await;

        let state = crate::state::tests::test_state_with(&server.url());
        let heartbeats = vec![
            Heartbeat::at(Utc.timestamp_opt(1_750_000_000, 0).unwrap())
                .with_entity("proj/src/main.rs")
                .with_branch("main")
                .with_position(20, 2),
            Heartbeat::at(Utc.timestamp_opt(1_750_000_030, 0).unwrap())
                .with_entity("proj/src/main.rs")
                .with_branch("main")
                .with_position(22, 5),
            Heartbeat::at(Utc.timestamp_opt(1_750_000_060, 0).unwrap())
                .with_entity("proj/src/util.rs")
                .with_branch("main"),
        ];
        let clusters = cluster(heartbeats.clone());
        state.sessions.write().await.insert(
            "rec1".to_string(),
            ReviewSession {
                generation: 1,
                submission: crate::state::tests::sample_submission(),
                user_id: 7,
                matched_projects: Vec::new(),
                heartbeats,
                clusters,
                fetched_at: Utc::now(),
            },
        );

        let app = create_app(state);
        let (status, body) = get(
            app,
            "/api/submissions/rec1/clusters/0/frame?entity=proj%2Fsrc%2Fmain.rs&index=1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["relativePath"], "main.rs");
        assert_eq!(json["branch"], "main");
        assert_eq!(json["lineno"], 22);
        // Window: 10 above, 10 below line 22.
        let lines = json["frame"]["lines"].as_array().unwrap();
        assert_eq!(lines.first().unwrap()["number"], 12);
        assert_eq!(lines.last().unwrap()["number"], 32);
        assert_eq!(json["frame"]["cursor"]["col"], 5);
    }

    #[tokio::test]
    async fn test_playback_frame_missing_source_is_404() {
        use crate::state::ReviewSession;
        use chrono::{TimeZone, Utc};
        use harborview_core::{cluster, Heartbeat};

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/dev/weather-wand/main/main.rs")
            .with_status(404)
            .create_async()
            .await;

        let state = crate::state::tests::test_state_with(&server.url());
        let heartbeats = vec![Heartbeat::at(Utc.timestamp_opt(1_750_000_000, 0).unwrap())
            .with_entity("proj/main.rs")
            .with_branch("main")];
        let clusters = cluster(heartbeats.clone());
        state.sessions.write().await.insert(
            "rec1".to_string(),
            ReviewSession {
                generation: 1,
                submission: crate::state::tests::sample_submission(),
                user_id: 7,
                matched_projects: Vec::new(),
                heartbeats,
                clusters,
                fetched_at: Utc::now(),
            },
        );

        let app = create_app(state);
        let (status, body) = get(
            app,
            "/api/submissions/rec1/clusters/0/frame?entity=proj%2Fmain.rs&index=0",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Source file not found");
    }

    #[tokio::test]
    async fn test_submissions_list_unreachable_store_is_bad_gateway() {
        // The test state's store points at an unroutable address; the list
        // endpoint must surface an upstream error, not hang or panic.
        let (status, body) = get(app(), "/api/submissions").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Upstream service error");
    }
}

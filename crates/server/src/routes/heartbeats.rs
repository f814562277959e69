// crates/server/src/routes/heartbeats.rs
//! Heartbeat ingest trigger and progress endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::sync::spawn_ingest;

/// Response to a sync trigger.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct SyncStarted {
    pub submission_id: String,
    /// Generation of the started run; prior in-flight runs are cancelled.
    #[ts(type = "number")]
    pub generation: u64,
}

/// Ingest progress snapshot.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct IngestProgress {
    pub submission_id: Option<String>,
    pub status: String,
    pub days_done: usize,
    pub days_total: usize,
    pub heartbeats_found: usize,
    pub error: Option<String>,
}

/// POST /api/submissions/{id}/heartbeats/sync - Start (or restart) the
/// day-by-day heartbeat ingest for a submission.
///
/// Any run already in flight is cancelled via its token; its late results
/// are discarded, never applied.
pub async fn start_sync(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SyncStarted>> {
    let submission = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::SubmissionNotFound(id.clone()))?;

    if submission.hackatime_project_keys.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Submission {id} declares no time-tracking project keys"
        )));
    }

    let generation = spawn_ingest(state.clone(), submission);
    Ok(Json(SyncStarted {
        submission_id: id,
        generation,
    }))
}

/// GET /api/submissions/{id}/heartbeats/progress - Day-counter progress for
/// the latest ingest run of this submission.
pub async fn sync_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<IngestProgress> {
    let current = state.ingest.submission();
    let (days_done, days_total) = state.ingest.days();

    // Progress state tracks the latest run; asking about a different
    // submission reports idle rather than someone else's counters.
    if current.as_deref() != Some(id.as_str()) {
        return Json(IngestProgress {
            submission_id: Some(id),
            status: "idle".to_string(),
            days_done: 0,
            days_total: 0,
            heartbeats_found: 0,
            error: None,
        });
    }

    Json(IngestProgress {
        submission_id: current,
        status: state.ingest.status().as_str().to_string(),
        days_done,
        days_total,
        heartbeats_found: state.ingest.heartbeats_found(),
        error: state.ingest.error(),
    })
}

/// Create the heartbeat routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submissions/{id}/heartbeats/sync", post(start_sync))
        .route("/submissions/{id}/heartbeats/progress", get(sync_progress))
}

// crates/server/src/routes/hours.rs
//! Hour aggregation and hour-sync endpoints.
//!
//! The aggregate is advisory and never written back; hour-sync writes its
//! confirmed result to the submission record through the store.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use ts_rs::TS;

use harborview_core::{
    aggregate_hours, hour_sync, relevant_project_keys, DeclaredSubmission, MatchedProject,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics::RequestTimer;
use crate::state::AppState;

/// Advisory cross-submission aggregate ("YSWS aggregate").
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub label: String,
    /// De-duplicated union of the author's relevant project keys.
    pub keys: Vec<String>,
    pub matched: Vec<MatchedProject>,
    #[ts(type = "number")]
    pub total_seconds: u64,
    pub total_hours: f64,
}

/// Result of a reviewer-triggered hour-sync.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct HourSyncResponse {
    /// `false` means zero projects matched: nothing was written.
    pub updated: bool,
    pub hours: Option<f64>,
    pub justification: Option<String>,
    pub matched: Vec<MatchedProject>,
}

/// Resolve the author's time-tracking projects, or a not-found message.
async fn author_projects(
    state: &AppState,
    email: &str,
) -> ApiResult<Vec<harborview_core::TrackedProject>> {
    let user_id = state
        .hackatime
        .find_user_id_by_email(email)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("No time-tracking user for {email}")))?;
    Ok(state.hackatime.get_user_projects(user_id).await?)
}

/// GET /api/submissions/{id}/aggregate - Total tracked hours across every
/// project any of the author's approved submissions declares.
///
/// The key set is a de-duplicated union, so a project referenced by two
/// submissions is summed exactly once. Advisory: nothing is written back.
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AggregateResponse>> {
    let timer = RequestTimer::new("aggregate");

    let submission = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::SubmissionNotFound(id.clone()))?;

    let siblings = state
        .store
        .list_by_author(&submission.author_email)
        .await?
        .into_iter()
        .map(|s| DeclaredSubmission {
            approved: s.approved,
            project_keys: s.hackatime_project_keys,
        })
        .collect::<Vec<_>>();

    let keys = relevant_project_keys(
        &submission.hackatime_project_keys,
        submission.approved,
        &siblings,
    );
    let projects = author_projects(&state, &submission.author_email).await?;
    let totals = aggregate_hours(&keys, &projects);

    timer.finish_ok();
    Ok(Json(AggregateResponse {
        label: "YSWS aggregate".to_string(),
        keys,
        matched: totals.matched,
        total_seconds: totals.total_seconds,
        total_hours: totals.total_hours,
    }))
}

/// POST /api/submissions/{id}/hour-sync - Fuzzy-match the submission's own
/// keys against the author's tracked projects and write the rounded total
/// (with its justification) back to the record.
///
/// Zero matches performs no update and generates no justification.
pub async fn apply_hour_sync(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<HourSyncResponse>> {
    let timer = RequestTimer::new("hour_sync");

    let submission = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::SubmissionNotFound(id.clone()))?;

    let projects = author_projects(&state, &submission.author_email).await?;

    let Some(sync) = hour_sync(&submission.hackatime_project_keys, &projects) else {
        tracing::info!(submission_id = %id, "Hour-sync matched nothing; no update");
        timer.finish_ok();
        return Ok(Json(HourSyncResponse {
            updated: false,
            hours: None,
            justification: None,
            matched: Vec::new(),
        }));
    };

    state
        .store
        .apply_hour_sync(&id, sync.hours, &sync.justification)
        .await?;

    timer.finish_ok();
    Ok(Json(HourSyncResponse {
        updated: true,
        hours: Some(sync.hours),
        justification: Some(sync.justification),
        matched: sync.matched,
    }))
}

/// Create the hours routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submissions/{id}/aggregate", get(aggregate))
        .route("/submissions/{id}/hour-sync", post(apply_hour_sync))
}

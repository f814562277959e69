// crates/server/src/routes/submissions.rs
//! Submission list and detail endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use ts_rs::TS;

use harborview_clients::Submission;
use harborview_core::TrustLevel;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Submission detail with the independent trust-level lookup.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    pub submission: Submission,
    /// `None` when the author has no time-tracking user or the lookup
    /// failed -- advisory, never blocks the rest of the detail view.
    pub trust_level: Option<TrustLevel>,
}

/// GET /api/submissions - All submissions in the review queue.
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Submission>>> {
    let submissions = state.store.list().await?;
    Ok(Json(submissions))
}

/// GET /api/submissions/{id} - One submission plus its author's trust level.
///
/// The trust lookup runs independently: any failure there degrades to
/// `null` and is logged, it never fails the detail response.
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SubmissionDetail>> {
    let submission = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::SubmissionNotFound(id.clone()))?;

    let trust_level = lookup_trust_level(&state, &submission.author_email).await;

    Ok(Json(SubmissionDetail {
        submission,
        trust_level,
    }))
}

async fn lookup_trust_level(state: &AppState, email: &str) -> Option<TrustLevel> {
    if email.trim().is_empty() {
        return None;
    }
    let user_id = match state.hackatime.find_user_id_by_email(email).await {
        Ok(found) => found?,
        Err(e) => {
            tracing::warn!(error = %e, "Trust-level user lookup failed");
            return None;
        }
    };
    match state.hackatime.get_trust_level(user_id).await {
        Ok(trust) => Some(trust),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Trust-level lookup failed");
            None
        }
    }
}

/// Create the submissions routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/{id}", get(get_submission))
}

// crates/server/src/sync.rs
//! Background heartbeat ingest runs.
//!
//! A run resolves the author's time-tracking user, matches their projects
//! against the submission's declared keys, then walks the day span
//! sequentially via [`harborview_clients::ingest_heartbeats`]. Results are
//! applied only while the run's generation is still current and its token
//! uncancelled -- a stale run finishes into the void.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use harborview_clients::{ingest_heartbeats, match_projects, Submission};
use harborview_core::{cluster, parse_project_keys, Heartbeat};

use crate::ingest_state::IngestStatus;
use crate::metrics::record_ingest;
use crate::state::{AppState, ReviewSession};

/// Start an ingest run for a submission, cancelling any run in flight.
/// Returns the new run's generation.
pub fn spawn_ingest(state: Arc<AppState>, submission: Submission) -> u64 {
    let (generation, token) = state.ingest.begin(&submission.id);
    tracing::info!(
        submission_id = %submission.id,
        generation,
        "Starting heartbeat ingest"
    );

    tokio::spawn(async move {
        let started = Instant::now();
        match run_ingest(&state, &submission, generation, &token).await {
            Ok(Some(count)) => {
                record_ingest("done", started.elapsed(), Some(count as u64));
            }
            Ok(None) => {
                // Cancelled or superseded -- a newer run owns the state now.
                tracing::debug!(submission_id = %submission.id, generation, "Ingest run discarded");
            }
            Err(message) => {
                if state.ingest.is_current(generation) {
                    tracing::warn!(
                        submission_id = %submission.id,
                        error = %message,
                        "Ingest run failed"
                    );
                    state.ingest.set_error(message);
                    record_ingest("error", started.elapsed(), None);
                }
            }
        }
    });

    generation
}

/// `Ok(Some(heartbeat_count))` on applied success, `Ok(None)` when the run
/// was cancelled or superseded, `Err` on failure. Partial results are never
/// applied: the error path surfaces a message and nothing else.
async fn run_ingest(
    state: &Arc<AppState>,
    submission: &Submission,
    generation: u64,
    token: &CancellationToken,
) -> Result<Option<usize>, String> {
    let email = submission.author_email.trim();
    if email.is_empty() {
        return Err("Submission has no author email".to_string());
    }

    let user_id = state
        .hackatime
        .find_user_id_by_email(email)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No time-tracking user for {email}"))?;

    if token.is_cancelled() {
        return Ok(None);
    }

    let projects = state
        .hackatime
        .get_user_projects(user_id)
        .await
        .map_err(|e| e.to_string())?;
    let keys = parse_project_keys(&submission.hackatime_project_keys);
    let matched = match_projects(&keys, &projects);
    if matched.is_empty() {
        return Err(format!(
            "No time-tracking projects match keys \"{}\"",
            submission.hackatime_project_keys
        ));
    }

    if token.is_cancelled() {
        return Ok(None);
    }
    state.ingest.set_status(IngestStatus::FetchingDays);

    let report = ingest_heartbeats(&state.hackatime, user_id, &matched, token, |done, total| {
        state.ingest.set_days(done, total);
    })
    .await
    .map_err(|e| e.to_string())?;

    let Some(report) = report else {
        return Ok(None);
    };
    if !state.ingest.is_current(generation) {
        return Ok(None);
    }

    // Clusters own the canonical ordering; flatten them back out so the
    // session's heartbeat vector is ascending by `time` as well.
    let clusters = cluster(report.heartbeats);
    let heartbeats: Vec<Heartbeat> = clusters
        .iter()
        .flat_map(|c| c.heartbeats.iter().cloned())
        .collect();
    let count = heartbeats.len();

    let session = ReviewSession {
        generation,
        submission: submission.clone(),
        user_id,
        matched_projects: matched,
        heartbeats,
        clusters,
        fetched_at: chrono::Utc::now(),
    };
    state
        .sessions
        .write()
        .await
        .insert(submission.id.clone(), session);

    state.ingest.set_heartbeats_found(count);
    state.ingest.set_status(IngestStatus::Done);
    tracing::info!(
        submission_id = %submission.id,
        heartbeats = count,
        "Ingest applied to review session"
    );

    Ok(Some(count))
}

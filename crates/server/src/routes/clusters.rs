// crates/server/src/routes/clusters.rs
//! Cluster, file-group, delta, and playback-frame endpoints over the
//! ingested review session of one submission.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use harborview_clients::parse_repo_url;
use harborview_core::{
    group_by_file, position_series, render_frame, significant_clusters, Cluster, Frame,
    HeartbeatDelta, PositionPoint, DEFAULT_BRANCH,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics::RequestTimer;
use crate::state::AppState;

/// One cluster, without its member payload.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub id: usize,
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    #[ts(type = "string")]
    pub end_time: DateTime<Utc>,
    pub heartbeat_count: usize,
    #[ts(type = "number")]
    pub duration_secs: i64,
}

impl From<&Cluster> for ClusterSummary {
    fn from(c: &Cluster) -> Self {
        Self {
            id: c.id,
            start_time: c.start_time,
            end_time: c.end_time,
            heartbeat_count: c.len(),
            duration_secs: c.duration().num_seconds(),
        }
    }
}

/// Response for the cluster list.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    pub clusters: Vec<ClusterSummary>,
    /// Total clusters before the significance filter.
    pub total: usize,
    /// Whether the significance filter was applied.
    pub filtered: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClustersQuery {
    /// `?all=true` bypasses the significance filter.
    #[serde(default)]
    pub all: bool,
}

/// One file group, without its member payload.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FileGroupSummary {
    pub entity: String,
    pub relative_path: String,
    pub heartbeat_count: usize,
    /// Branch of the group's first heartbeat; drives the source fetch.
    pub branch: String,
}

/// Response for the file-group listing of one cluster.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FilesResponse {
    pub project_root: String,
    /// Sorted by descending heartbeat count (most-edited file first).
    pub groups: Vec<FileGroupSummary>,
}

/// Response for the inspection plots of one cluster.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct DeltasResponse {
    /// `None` when the cluster has fewer than 2 heartbeats.
    pub deltas: Option<Vec<HeartbeatDelta>>,
    pub positions: Vec<PositionPoint>,
}

#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    pub entity: String,
    pub index: usize,
}

/// Playback frame plus the heartbeat that produced it.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FrameResponse {
    pub frame: Frame,
    pub relative_path: String,
    pub branch: String,
    pub index: usize,
    pub total_heartbeats: usize,
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    pub lineno: Option<u32>,
    pub cursorpos: Option<u32>,
}

/// Fetch a cluster's heartbeats out of the review session, cloning so no
/// lock is held across downstream awaits.
async fn cluster_heartbeats(
    state: &AppState,
    submission_id: &str,
    cluster_id: usize,
) -> ApiResult<Vec<harborview_core::Heartbeat>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(submission_id)
        .ok_or_else(|| ApiError::HeartbeatsNotReady(submission_id.to_string()))?;
    let cluster = session
        .clusters
        .iter()
        .find(|c| c.id == cluster_id)
        .ok_or(ApiError::ClusterNotFound(cluster_id))?;
    Ok(cluster.heartbeats.clone())
}

/// GET /api/submissions/{id}/clusters - Clusters of the ingested heartbeat
/// set. Significant clusters only by default; `?all=true` returns every one.
pub async fn list_clusters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ClustersQuery>,
) -> ApiResult<Json<ClustersResponse>> {
    let timer = RequestTimer::new("clusters");
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&id)
        .ok_or_else(|| ApiError::HeartbeatsNotReady(id.clone()))?;

    let total = session.clusters.len();
    let (summaries, filtered) = if query.all {
        (session.clusters.iter().map(Into::into).collect(), false)
    } else {
        let significant = significant_clusters(&session.clusters);
        let filtered = significant.len() != total;
        (
            significant.into_iter().map(Into::into).collect::<Vec<ClusterSummary>>(),
            filtered,
        )
    };

    timer.finish_ok();
    Ok(Json(ClustersResponse {
        clusters: summaries,
        total,
        filtered,
    }))
}

/// GET /api/submissions/{id}/clusters/{cluster_id}/files - File groups and
/// the inferred project root for one cluster.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path((id, cluster_id)): Path<(String, usize)>,
) -> ApiResult<Json<FilesResponse>> {
    let heartbeats = cluster_heartbeats(&state, &id, cluster_id).await?;
    let report = group_by_file(&heartbeats);

    let groups = report
        .groups
        .iter()
        .map(|g| FileGroupSummary {
            entity: g.entity.clone(),
            relative_path: g.relative_path.clone(),
            heartbeat_count: g.len(),
            branch: g
                .heartbeats
                .first()
                .map(|h| h.branch.as_str())
                .filter(|b| !b.is_empty())
                .unwrap_or(DEFAULT_BRANCH)
                .to_string(),
        })
        .collect();

    Ok(Json(FilesResponse {
        project_root: report.project_root,
        groups,
    }))
}

/// GET /api/submissions/{id}/clusters/{cluster_id}/deltas - Inter-event
/// delta series and position scatter for the inspection plots.
pub async fn cluster_deltas(
    State(state): State<Arc<AppState>>,
    Path((id, cluster_id)): Path<(String, usize)>,
) -> ApiResult<Json<DeltasResponse>> {
    let heartbeats = cluster_heartbeats(&state, &id, cluster_id).await?;

    Ok(Json(DeltasResponse {
        deltas: harborview_core::delta_series(&heartbeats),
        positions: position_series(&heartbeats),
    }))
}

/// GET /api/submissions/{id}/clusters/{cluster_id}/frame?entity=&index= -
/// Source window with cursor mark for one heartbeat of one file group.
///
/// The source fetch is keyed (owner, repo, relative path, branch of the
/// group's first heartbeat) and served through the TTL cache. A 404 from
/// the code host is a not-found condition scoped to this panel.
pub async fn playback_frame(
    State(state): State<Arc<AppState>>,
    Path((id, cluster_id)): Path<(String, usize)>,
    Query(query): Query<FrameQuery>,
) -> ApiResult<Json<FrameResponse>> {
    let timer = RequestTimer::new("frame");

    let (heartbeats, repo_url) = {
        let sessions = state.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| ApiError::HeartbeatsNotReady(id.clone()))?;
        let cluster = session
            .clusters
            .iter()
            .find(|c| c.id == cluster_id)
            .ok_or(ApiError::ClusterNotFound(cluster_id))?;
        (cluster.heartbeats.clone(), session.submission.repo_url.clone())
    };

    let report = group_by_file(&heartbeats);
    let group = report
        .groups
        .into_iter()
        .find(|g| g.entity == query.entity)
        .ok_or_else(|| ApiError::FileGroupNotFound(query.entity.clone()))?;

    if query.index >= group.heartbeats.len() {
        return Err(ApiError::BadRequest(format!(
            "Heartbeat index {} out of range (group has {})",
            query.index,
            group.heartbeats.len()
        )));
    }

    let (owner, repo) = parse_repo_url(&repo_url).ok_or_else(|| {
        ApiError::BadRequest(format!("Submission has no parseable repository URL: {repo_url}"))
    })?;
    let branch = group
        .heartbeats
        .first()
        .map(|h| h.branch.as_str())
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BRANCH)
        .to_string();

    let fetched = state
        .codehost
        .get_file_at_branch(&owner, &repo, &group.relative_path, &branch)
        .await?;
    let Some(source) = fetched else {
        timer.finish_err(404);
        return Err(ApiError::SourceNotFound {
            path: group.relative_path.clone(),
            branch,
        });
    };

    let heartbeat = &group.heartbeats[query.index];
    let frame = render_frame(&source, heartbeat.lineno.unwrap_or(1), heartbeat.cursorpos);

    timer.finish_ok();
    Ok(Json(FrameResponse {
        frame,
        relative_path: group.relative_path.clone(),
        branch,
        index: query.index,
        total_heartbeats: group.heartbeats.len(),
        time: heartbeat.time,
        lineno: heartbeat.lineno,
        cursorpos: heartbeat.cursorpos,
    }))
}

/// Create the cluster routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submissions/{id}/clusters", get(list_clusters))
        .route(
            "/submissions/{id}/clusters/{cluster_id}/files",
            get(list_files),
        )
        .route(
            "/submissions/{id}/clusters/{cluster_id}/deltas",
            get(cluster_deltas),
        )
        .route(
            "/submissions/{id}/clusters/{cluster_id}/frame",
            get(playback_frame),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use harborview_core::{cluster, Heartbeat};

    use crate::state::tests::{sample_submission, test_state};
    use crate::state::ReviewSession;

    fn hb(secs: i64, entity: &str) -> Heartbeat {
        Heartbeat::at(Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap())
            .with_entity(entity)
            .with_project("weather-wand")
    }

    async fn seeded_state() -> Arc<AppState> {
        let state = test_state();
        let heartbeats = vec![
            hb(0, "proj/src/main.rs"),
            hb(30, "proj/src/main.rs"),
            hb(60, "proj/src/util.rs"),
            // Second cluster, one heartbeat, after a >15min gap.
            hb(3000, "proj/src/main.rs"),
        ];
        let clusters = cluster(heartbeats.clone());
        let session = ReviewSession {
            generation: 1,
            submission: sample_submission(),
            user_id: 7,
            matched_projects: Vec::new(),
            heartbeats,
            clusters,
            fetched_at: Utc::now(),
        };
        state
            .sessions
            .write()
            .await
            .insert("rec1".to_string(), session);
        state
    }

    #[tokio::test]
    async fn test_list_clusters_falls_back_when_none_significant() {
        let state = seeded_state().await;
        let response = list_clusters(
            State(state),
            Path("rec1".to_string()),
            Query(ClustersQuery::default()),
        )
        .await
        .unwrap();

        // Both clusters are under the significance minimum, so all show.
        assert_eq!(response.0.total, 2);
        assert_eq!(response.0.clusters.len(), 2);
        assert!(!response.0.filtered);
    }

    #[tokio::test]
    async fn test_list_clusters_missing_session_is_conflict() {
        let state = test_state();
        let err = list_clusters(
            State(state),
            Path("unknown".to_string()),
            Query(ClustersQuery::default()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::HeartbeatsNotReady(_)));
    }

    #[tokio::test]
    async fn test_list_files_groups_and_root() {
        let state = seeded_state().await;
        let response = list_files(State(state), Path(("rec1".to_string(), 0)))
            .await
            .unwrap();

        assert_eq!(response.0.project_root, "proj/src");
        assert_eq!(response.0.groups.len(), 2);
        // Most-edited file first.
        assert_eq!(response.0.groups[0].entity, "proj/src/main.rs");
        assert_eq!(response.0.groups[0].heartbeat_count, 2);
        assert_eq!(response.0.groups[0].branch, DEFAULT_BRANCH);
    }

    #[tokio::test]
    async fn test_cluster_not_found() {
        let state = seeded_state().await;
        let err = list_files(State(state), Path(("rec1".to_string(), 99)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ClusterNotFound(99)));
    }

    #[tokio::test]
    async fn test_deltas_not_enough_data_in_singleton_cluster() {
        let state = seeded_state().await;
        let response = cluster_deltas(State(state), Path(("rec1".to_string(), 1)))
            .await
            .unwrap();

        assert!(response.0.deltas.is_none());
        assert_eq!(response.0.positions.len(), 1);
    }

    #[tokio::test]
    async fn test_deltas_present_for_multi_heartbeat_cluster() {
        let state = seeded_state().await;
        let response = cluster_deltas(State(state), Path(("rec1".to_string(), 0)))
            .await
            .unwrap();

        let deltas = response.0.deltas.unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].dt_ms, 30_000);
        assert_eq!(response.0.positions.len(), 3);
    }

    #[test]
    fn test_cluster_summary_from_cluster() {
        let clusters = cluster(vec![hb(0, "a.rs"), hb(120, "a.rs")]);
        let summary = ClusterSummary::from(&clusters[0]);

        assert_eq!(summary.heartbeat_count, 2);
        assert_eq!(summary.duration_secs, 120);
    }
}

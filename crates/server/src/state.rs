// crates/server/src/state.rs
//! Application state for the Axum server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use harborview_clients::{CodeHostClient, HackatimeClient, SubmissionStore, Submission};
use harborview_core::{Cluster, Heartbeat, TrackedProject};

use crate::ingest_state::IngestState;

/// Ingested review data for one submission. Owned by this entry alone --
/// heartbeats, clusters, and selection state are never shared across
/// submissions, and the whole entry is replaced atomically when a sync
/// run completes.
pub struct ReviewSession {
    /// Generation of the ingest run that produced this data.
    pub generation: u64,
    /// Snapshot of the submission at sync time (for repo URL and keys).
    pub submission: Submission,
    pub user_id: u64,
    pub matched_projects: Vec<TrackedProject>,
    /// Heartbeats for the matched projects, ascending by `time`.
    pub heartbeats: Vec<Heartbeat>,
    /// Clusters derived from `heartbeats`; recomputed on every ingest.
    pub clusters: Vec<Cluster>,
    pub fetched_at: DateTime<Utc>,
}

/// Map of submission id to its ingested review session.
pub type ReviewSessionMap = RwLock<HashMap<String, ReviewSession>>;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Time-tracking admin API client.
    pub hackatime: HackatimeClient,
    /// Code-hosting client with the TTL source cache.
    pub codehost: CodeHostClient,
    /// Spreadsheet-service submission store.
    pub store: SubmissionStore,
    /// Ingest progress state (lock-free atomics) plus run cancellation.
    pub ingest: IngestState,
    /// Per-submission ingested heartbeat data.
    pub sessions: ReviewSessionMap,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(
        hackatime: HackatimeClient,
        codehost: CodeHostClient,
        store: SubmissionStore,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            hackatime,
            codehost,
            store,
            ingest: IngestState::new(),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// crates/core/src/cluster.rs
//! Groups a flat heartbeat stream into temporally contiguous work sessions.
//!
//! A cluster is a maximal run of heartbeats where no inter-event gap exceeds
//! [`CLUSTER_GAP_MS`]. Clustering is a pure function over in-memory data --
//! it cannot fail, and it is recomputed from scratch whenever the heartbeat
//! set changes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::heartbeat::Heartbeat;

/// Idle gap that closes a work session: 15 minutes.
pub const CLUSTER_GAP_MS: i64 = 15 * 60 * 1000;

/// Clusters with fewer member heartbeats than this are hidden by default.
/// Presentation policy only -- it never changes cluster boundaries.
pub const MIN_SIGNIFICANT_HEARTBEATS: usize = 11;

/// An inferred continuous work session.
///
/// `id` is a positional ordinal regenerated on every clustering call.
/// It is stable only within one invocation -- display-only, never persist it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct Cluster {
    pub id: usize,
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    #[ts(type = "string")]
    pub end_time: DateTime<Utc>,
    /// Members, ascending by `time`.
    pub heartbeats: Vec<Heartbeat>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.heartbeats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heartbeats.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Partition heartbeats into clusters.
///
/// Input may be empty or unordered. Heartbeats are sorted ascending by
/// `time` (stable, so identical timestamps keep their input order -- there
/// is deliberately no secondary key), then scanned once: a gap greater than
/// [`CLUSTER_GAP_MS`] to the previous heartbeat closes the running cluster.
///
/// The output is a gap-free partition ordered by `start_time`: every input
/// heartbeat lands in exactly one cluster, none are dropped or duplicated.
pub fn cluster(mut heartbeats: Vec<Heartbeat>) -> Vec<Cluster> {
    if heartbeats.is_empty() {
        return Vec::new();
    }

    heartbeats.sort_by_key(|h| h.time);

    let gap = Duration::milliseconds(CLUSTER_GAP_MS);
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut current: Vec<Heartbeat> = Vec::new();

    for hb in heartbeats {
        if let Some(last) = current.last() {
            if hb.time - last.time > gap {
                clusters.push(close(clusters.len(), std::mem::take(&mut current)));
            }
        }
        current.push(hb);
    }
    clusters.push(close(clusters.len(), current));

    clusters
}

fn close(id: usize, heartbeats: Vec<Heartbeat>) -> Cluster {
    // Callers only pass non-empty runs; first()/last() always exist.
    let start_time = heartbeats
        .first()
        .map(|h| h.time)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let end_time = heartbeats
        .last()
        .map(|h| h.time)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Cluster {
        id,
        start_time,
        end_time,
        heartbeats,
    }
}

/// Clusters worth showing by default: those with at least
/// [`MIN_SIGNIFICANT_HEARTBEATS`] members. When none qualify, every cluster
/// is returned so the reviewer is never shown an empty timeline.
pub fn significant_clusters(clusters: &[Cluster]) -> Vec<&Cluster> {
    let significant: Vec<&Cluster> = clusters
        .iter()
        .filter(|c| c.len() >= MIN_SIGNIFICANT_HEARTBEATS)
        .collect();

    if significant.is_empty() {
        clusters.iter().collect()
    } else {
        significant
    }
}

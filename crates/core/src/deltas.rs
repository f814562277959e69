// crates/core/src/deltas.rs
//! Derived series for the inspection plots: position-vs-time scatter and
//! inter-event deltas between consecutive heartbeats of a cluster.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::heartbeat::Heartbeat;

/// Differences between heartbeat `i` and its predecessor. Missing line or
/// cursor values are treated as zero for the magnitude computation.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct HeartbeatDelta {
    /// 1-based index of the later heartbeat in the cluster.
    pub index: usize,
    /// Milliseconds since the previous heartbeat. Non-negative: the input
    /// is cluster-ordered.
    #[ts(type = "number")]
    pub dt_ms: i64,
    /// `|lineno[i] - lineno[i-1]|`
    pub dline: u32,
    /// `|cursorpos[i] - cursorpos[i-1]|`
    pub dcursor: u32,
}

/// One point of the position-vs-time scatter.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct PositionPoint {
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    pub lineno: Option<u32>,
    pub cursorpos: Option<u32>,
}

/// Delta series over a cluster's heartbeats.
///
/// Requires at least 2 heartbeats; fewer yields `None` ("not enough data").
pub fn delta_series(heartbeats: &[Heartbeat]) -> Option<Vec<HeartbeatDelta>> {
    if heartbeats.len() < 2 {
        return None;
    }

    Some(
        heartbeats
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let (prev, cur) = (&pair[0], &pair[1]);
                HeartbeatDelta {
                    index: i + 1,
                    dt_ms: (cur.time - prev.time).num_milliseconds(),
                    dline: cur.lineno.unwrap_or(0).abs_diff(prev.lineno.unwrap_or(0)),
                    dcursor: cur
                        .cursorpos
                        .unwrap_or(0)
                        .abs_diff(prev.cursorpos.unwrap_or(0)),
                }
            })
            .collect(),
    )
}

/// Position samples for the scatter plot, in cluster order.
pub fn position_series(heartbeats: &[Heartbeat]) -> Vec<PositionPoint> {
    heartbeats
        .iter()
        .map(|h| PositionPoint {
            time: h.time,
            lineno: h.lineno,
            cursorpos: h.cursorpos,
        })
        .collect()
}

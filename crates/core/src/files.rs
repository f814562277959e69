// crates/core/src/files.rs
//! Project-root inference and per-file heartbeat grouping.
//!
//! Heartbeat `entity` paths arrive as whatever the editor reported:
//! absolute, relative, forward or back slashes. To show clean paths and to
//! build code-host fetch URLs, we infer the project root shared by a
//! cluster's entities and strip it. The root is advisory -- a wrong guess
//! degrades display and source fetching, nothing else.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use ts_rs::TS;

use crate::heartbeat::Heartbeat;

/// Heartbeats of one cluster bucketed by reported `entity`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct FileGroup {
    /// Raw path as reported by the tool.
    pub entity: String,
    /// Entity with the inferred project root stripped.
    pub relative_path: String,
    /// Members, in cluster order (ascending by `time`).
    pub heartbeats: Vec<Heartbeat>,
}

impl FileGroup {
    pub fn len(&self) -> usize {
        self.heartbeats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heartbeats.is_empty()
    }
}

/// Output of [`group_by_file`]: groups sharing one inferred root.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct FileReport {
    /// Sorted by descending heartbeat count, so the most-edited file comes
    /// first and default selection lands on the richest activity.
    pub groups: Vec<FileGroup>,
    pub project_root: String,
}

/// Split an entity path on both separator kinds, discarding empty segments.
fn split_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// Infer the shared project root over distinct entity paths.
///
/// Every directory prefix (lengths 1..len-1) of every distinct entity bumps
/// a counter; the prefix maximizing `count * depth` wins, but only prefixes
/// occurring in at least 2 distinct entities are eligible. Ties keep the
/// first-visited prefix. Deeper shared ancestors beat shallow ones, but a
/// single file's own directories never outvote a genuinely shared root.
///
/// No eligible prefix (one distinct file, or nothing shared) falls back to
/// the first entity's path with its filename dropped.
fn infer_project_root(entities: &[&str]) -> String {
    if entities.is_empty() {
        return String::new();
    }

    // Insertion-ordered counting: the Vec preserves first-visit order for
    // the tie break, the map gives O(1) lookup.
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for entity in entities {
        let segments = split_segments(entity);
        for depth in 1..segments.len() {
            let prefix = segments[..depth].join("/");
            match counts.get_mut(&prefix) {
                Some(n) => *n += 1,
                None => {
                    counts.insert(prefix.clone(), 1);
                    order.push((prefix, depth));
                }
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (prefix, depth) in &order {
        let count = counts[prefix];
        if count < 2 {
            continue;
        }
        let score = count * depth;
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((prefix, score));
        }
    }

    if let Some((prefix, _)) = best {
        return prefix.to_string();
    }

    // Fallback: first entity's directory.
    let segments = split_segments(entities[0]);
    if segments.len() <= 1 {
        String::new()
    } else {
        segments[..segments.len() - 1].join("/")
    }
}

/// Strip the inferred root from an entity, case-insensitively and
/// positionally. Matching stops at the first mismatch even if later
/// segments would align again -- this is a prefix match, not a multiset
/// comparison. Stripping everything falls back to the filename.
fn relative_path(entity: &str, root: &str) -> String {
    let segments = split_segments(entity);
    if segments.is_empty() {
        return String::new();
    }

    let root_segments = split_segments(root);
    let mut strip = 0;
    while strip < root_segments.len() && strip < segments.len() {
        if !segments[strip]
            .to_lowercase()
            .eq(&root_segments[strip].to_lowercase())
        {
            break;
        }
        strip += 1;
    }

    if strip >= segments.len() {
        // Entity path *is* the root; show just the filename.
        return segments[segments.len() - 1].to_string();
    }
    segments[strip..].join("/")
}

/// Bucket a cluster's heartbeats by entity and infer their shared root.
///
/// Empty input yields empty groups and an empty root string.
pub fn group_by_file(heartbeats: &[Heartbeat]) -> FileReport {
    if heartbeats.is_empty() {
        return FileReport {
            groups: Vec::new(),
            project_root: String::new(),
        };
    }

    // Distinct entities in first-seen order drive root inference.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entities: Vec<&str> = Vec::new();
    for hb in heartbeats {
        if seen.insert(hb.entity.as_str()) {
            entities.push(hb.entity.as_str());
        }
    }

    let project_root = infer_project_root(&entities);

    let mut groups: Vec<FileGroup> = entities
        .iter()
        .map(|entity| FileGroup {
            entity: entity.to_string(),
            relative_path: relative_path(entity, &project_root),
            heartbeats: heartbeats
                .iter()
                .filter(|h| h.entity == *entity)
                .cloned()
                .collect(),
        })
        .collect();

    // Stable sort: equal counts keep first-seen order.
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    FileReport {
        groups,
        project_root,
    }
}

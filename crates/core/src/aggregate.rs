// crates/core/src/aggregate.rs
//! Hour aggregation and hour-sync against time-tracking project totals.
//!
//! Two related but distinct operations share this module:
//!
//! - the *aggregate*: an advisory cross-submission total over every project
//!   any of an author's approved submissions declares, matched by exact
//!   case-insensitive name equality and never written back;
//! - *hour-sync*: a reviewer-triggered computation for one submission's own
//!   keys using fuzzy bidirectional substring matching, whose result (with a
//!   human-readable justification) is written back on confirmation.

use serde::Serialize;
use ts_rs::TS;

use crate::heartbeat::TrackedProject;

/// The subset of a submission the aggregation engine needs.
#[derive(Debug, Clone)]
pub struct DeclaredSubmission {
    pub approved: bool,
    /// Raw declared project-keys string (comma/semicolon separated).
    pub project_keys: String,
}

/// One matched time-tracking project with its contribution.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct MatchedProject {
    pub name: String,
    #[ts(type = "number")]
    pub seconds: u64,
    pub hours: f64,
}

/// Result of the advisory cross-submission aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct AggregateHours {
    pub matched: Vec<MatchedProject>,
    #[ts(type = "number")]
    pub total_seconds: u64,
    pub total_hours: f64,
}

/// Result of a reviewer-triggered hour-sync.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct HourSync {
    /// Total across matched projects, rounded to one decimal hour.
    pub hours: f64,
    /// Human-readable enumeration of each matched project's rounded hours.
    pub justification: String,
    pub matched: Vec<MatchedProject>,
}

/// Split a declared project-keys string on commas and semicolons, trimming
/// each fragment and dropping empties. Original casing is preserved --
/// matching normalizes on the fly.
pub fn parse_project_keys(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// The case-normalized union of declared keys relevant to an author.
///
/// Approved submissions always contribute. The viewed submission's own keys
/// join only when it is itself unapproved. An author with nothing approved
/// degenerates to the viewed submission alone.
pub fn relevant_project_keys(
    viewed_keys: &str,
    viewed_approved: bool,
    author_submissions: &[DeclaredSubmission],
) -> Vec<String> {
    fn push_unique(candidates: Vec<String>, keys: &mut Vec<String>) {
        for candidate in candidates {
            if !keys
                .iter()
                .any(|k| k.to_lowercase() == candidate.to_lowercase())
            {
                keys.push(candidate);
            }
        }
    }

    let mut keys: Vec<String> = Vec::new();

    for submission in author_submissions {
        if submission.approved {
            push_unique(parse_project_keys(&submission.project_keys), &mut keys);
        }
    }
    if !viewed_approved {
        push_unique(parse_project_keys(viewed_keys), &mut keys);
    }
    if keys.is_empty() {
        push_unique(parse_project_keys(viewed_keys), &mut keys);
    }

    keys
}

/// Sum service-reported durations over projects whose names exactly match a
/// relevant key, case-insensitively.
///
/// The key set is a de-duplicated union, so a project declared by two
/// submissions contributes exactly once.
pub fn aggregate_hours(keys: &[String], projects: &[TrackedProject]) -> AggregateHours {
    let key_set: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();

    let matched: Vec<MatchedProject> = projects
        .iter()
        .filter(|p| key_set.iter().any(|k| *k == p.name.to_lowercase()))
        .map(|p| MatchedProject {
            name: p.name.clone(),
            seconds: p.total_duration,
            hours: p.hours(),
        })
        .collect();

    let total_seconds: u64 = matched.iter().map(|m| m.seconds).sum();
    AggregateHours {
        matched,
        total_seconds,
        total_hours: total_seconds as f64 / 3600.0,
    }
}

fn round_tenth(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

/// Fuzzy hour-sync for one submission's declared keys.
///
/// Per key, the first service project matching by bidirectional
/// case-insensitive substring containment wins; a project matched through
/// several keys is still counted once. Zero matches is a silent no-op --
/// `None`, no justification.
pub fn hour_sync(keys_raw: &str, projects: &[TrackedProject]) -> Option<HourSync> {
    let mut matched: Vec<MatchedProject> = Vec::new();

    for key in parse_project_keys(keys_raw) {
        let key_lower = key.to_lowercase();
        let hit = projects.iter().find(|p| {
            let name_lower = p.name.to_lowercase();
            !name_lower.is_empty()
                && (key_lower.contains(&name_lower) || name_lower.contains(&key_lower))
        });
        if let Some(p) = hit {
            if !matched.iter().any(|m| m.name == p.name) {
                matched.push(MatchedProject {
                    name: p.name.clone(),
                    seconds: p.total_duration,
                    hours: p.hours(),
                });
            }
        }
    }

    if matched.is_empty() {
        return None;
    }

    let total_seconds: u64 = matched.iter().map(|m| m.seconds).sum();
    let hours = round_tenth(total_seconds as f64 / 3600.0);

    let parts: Vec<String> = matched
        .iter()
        .map(|m| format!("{} ({:.1}h)", m.name, round_tenth(m.hours)))
        .collect();
    let justification = format!(
        "Synced from time tracking: {} = {:.1}h total",
        parts.join(" + "),
        hours
    );

    Some(HourSync {
        hours,
        justification,
        matched,
    })
}

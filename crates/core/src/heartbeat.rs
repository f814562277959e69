// crates/core/src/heartbeat.rs
//! Records reported by the time-tracking admin service.
//!
//! Field names mirror the service's JSON so the records deserialize
//! straight off the wire. Everything except `time` is optional upstream
//! and defaults to empty/zero rather than failing the whole day's fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One coding-activity sample from a developer's editor.
///
/// `time` is the event's logical occurrence instant and the sole ordering
/// key. `created_at` is when the service ingested the sample -- it may lag
/// `time` by minutes and must never be used for ordering or clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct Heartbeat {
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub editor: String,
    /// File path as reported by the originating tool. May be absolute,
    /// relative, or use mixed path separators.
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub operating_system: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub line_additions: Option<i64>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub line_deletions: Option<i64>,
    /// 1-based line number at sample time.
    #[serde(default)]
    pub lineno: Option<u32>,
    /// Total line count of the file at sample time.
    #[serde(default)]
    pub lines: Option<u32>,
    /// 0-based character offset within the line.
    #[serde(default)]
    pub cursorpos: Option<u32>,
    #[serde(default)]
    pub project_root_count: Option<u32>,
    #[serde(default)]
    pub is_write: Option<bool>,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub ip_address: String,
}

impl Heartbeat {
    /// Minimal heartbeat for derived-data call sites and tests.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            created_at: None,
            project: String::new(),
            branch: String::new(),
            category: String::new(),
            editor: String::new(),
            entity: String::new(),
            language: String::new(),
            machine: String::new(),
            operating_system: String::new(),
            kind: String::new(),
            user_agent: String::new(),
            line_additions: None,
            line_deletions: None,
            lineno: None,
            lines: None,
            cursorpos: None,
            project_root_count: None,
            is_write: None,
            source_type: String::new(),
            ip_address: String::new(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_position(mut self, lineno: u32, cursorpos: u32) -> Self {
        self.lineno = Some(lineno);
        self.cursorpos = Some(cursorpos);
        self
    }
}

/// Per-project totals as reported by the time-tracking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct TrackedProject {
    #[serde(default)]
    pub name: String,
    /// Total recorded duration in seconds.
    #[serde(default)]
    #[ts(type = "number")]
    pub total_duration: u64,
    /// Unix timestamp of the first recorded heartbeat.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub first_heartbeat: Option<i64>,
    /// Unix timestamp of the last recorded heartbeat.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub last_heartbeat: Option<i64>,
}

impl TrackedProject {
    pub fn hours(&self) -> f64 {
        self.total_duration as f64 / 3600.0
    }
}

/// Externally computed abuse flag on a time-tracking user. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Trusted,
    Suspected,
    Convicted,
    Unscored,
}

impl TrustLevel {
    /// Parse the service's raw trust value. Unknown strings degrade to
    /// [`TrustLevel::Unscored`] rather than erroring -- the flag is advisory.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "trusted" | "green" | "blue" => Self::Trusted,
            "suspected" | "yellow" => Self::Suspected,
            "convicted" | "banned" | "red" => Self::Convicted,
            _ => Self::Unscored,
        }
    }
}

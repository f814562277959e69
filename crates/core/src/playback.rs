// crates/core/src/playback.rs
//! Timeline playback over one cluster's file group.
//!
//! [`PlaybackController`] is a pure state machine: it owns the selected
//! group, the heartbeat index, the play/pause flag, and the speed. Source
//! fetching happens outside -- selecting a group yields a [`FetchSpec`] the
//! caller resolves against the code host, then reports back via
//! [`source_loaded`](PlaybackController::source_loaded) or
//! [`fetch_failed`](PlaybackController::fetch_failed). Frame derivation is
//! an explicit function over the loaded source, never interleaved with
//! rendering.

use std::time::Duration;

use serde::Serialize;
use ts_rs::TS;

use crate::files::FileGroup;

/// Supported auto-advance speed multipliers.
pub const PLAYBACK_SPEEDS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

/// Context lines shown above and below the highlighted line.
pub const CONTEXT_LINES: usize = 10;

/// Branch used for source fetches when heartbeats carry none.
pub const DEFAULT_BRANCH: &str = "main";

/// Where the controller is in the fetch/playback lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// No file group selected.
    Idle,
    /// Source fetch in flight; stepping is blocked.
    Loading,
    /// Source available; stepping and playback permitted.
    Ready,
    /// Source fetch failed. Non-fatal: selecting another group recovers.
    Error,
}

/// What the caller must fetch after a group selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub relative_path: String,
    pub branch: String,
}

/// Stateful, scrubbable playback over a file group's heartbeats.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    phase: PlaybackPhase,
    playing: bool,
    speed: f64,
    index: usize,
    group: Option<FileGroup>,
    source: Option<String>,
    error: Option<String>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            playing: false,
            speed: 1.0,
            index: 0,
            group: None,
            source: None,
            error: None,
        }
    }

    pub fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn group(&self) -> Option<&FileGroup> {
        self.group.as_ref()
    }

    fn last_index(&self) -> usize {
        self.group
            .as_ref()
            .map(|g| g.heartbeats.len().saturating_sub(1))
            .unwrap_or(0)
    }

    /// Select a file group: resets the index to 0, stops playback, and
    /// enters `Loading`. Returns the fetch key -- relative path plus the
    /// branch of the group's first heartbeat.
    pub fn select_group(&mut self, group: FileGroup) -> FetchSpec {
        let branch = group
            .heartbeats
            .first()
            .map(|h| h.branch.as_str())
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH)
            .to_string();
        let spec = FetchSpec {
            relative_path: group.relative_path.clone(),
            branch,
        };

        self.group = Some(group);
        self.index = 0;
        self.playing = false;
        self.source = None;
        self.error = None;
        self.phase = PlaybackPhase::Loading;

        spec
    }

    /// Report a completed source fetch. Ignored unless a fetch is pending --
    /// a stale response for a previously selected group must not apply.
    pub fn source_loaded(&mut self, text: String) {
        if self.phase != PlaybackPhase::Loading {
            return;
        }
        self.source = Some(text);
        self.phase = PlaybackPhase::Ready;
    }

    /// Report a failed source fetch.
    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        if self.phase != PlaybackPhase::Loading {
            return;
        }
        self.error = Some(message.into());
        self.phase = PlaybackPhase::Error;
    }

    /// Toggle play/pause. Toggling play while positioned at the last
    /// heartbeat restarts from index 0 before auto-advance begins.
    pub fn toggle_play(&mut self) {
        if self.phase != PlaybackPhase::Ready {
            return;
        }
        if self.playing {
            self.playing = false;
            return;
        }
        if self.index >= self.last_index() {
            self.index = 0;
        }
        self.playing = true;
    }

    /// One auto-advance tick. Advances the index by one; reaching the last
    /// index stops playback (terminal condition, not cancellation). Returns
    /// whether playback is still running.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        if self.index < self.last_index() {
            self.index += 1;
        }
        if self.index >= self.last_index() {
            self.playing = false;
        }
        self.playing
    }

    /// Auto-advance period for the current speed: `1000ms / speed`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis((1000.0 / self.speed) as u64)
    }

    /// Set the playback speed. Values outside [`PLAYBACK_SPEEDS`] are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if PLAYBACK_SPEEDS.contains(&speed) {
            self.speed = speed;
        }
    }

    /// Manual step forward. Permitted in any state except mid-fetch; never
    /// starts or stops playback.
    pub fn step_next(&mut self) {
        if self.phase == PlaybackPhase::Loading {
            return;
        }
        if self.index < self.last_index() {
            self.index += 1;
        }
    }

    /// Manual step backward.
    pub fn step_prev(&mut self) {
        if self.phase == PlaybackPhase::Loading {
            return;
        }
        self.index = self.index.saturating_sub(1);
    }

    /// Manual seek (slider). Clamped to the group's bounds.
    pub fn seek(&mut self, index: usize) {
        if self.phase == PlaybackPhase::Loading {
            return;
        }
        self.index = index.min(self.last_index());
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Frame rendering
// ---------------------------------------------------------------------------

/// One source line inside a rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct FrameLine {
    /// 1-based line number in the file.
    pub number: usize,
    pub text: String,
    pub highlighted: bool,
}

/// Cursor mark on the highlighted line.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct CursorMark {
    /// 1-based line number.
    pub line: usize,
    /// 0-based character offset.
    pub col: usize,
    /// The character under the cursor, or `None` when `col` is past the end
    /// of the line (rendered as a blank placeholder).
    pub ch: Option<char>,
}

/// A window of source context around the current heartbeat's position.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
pub struct Frame {
    pub lines: Vec<FrameLine>,
    pub cursor: Option<CursorMark>,
    pub total_lines: usize,
}

/// Derive the playback frame for a heartbeat position over fetched source.
///
/// The window spans [`CONTEXT_LINES`] lines above and below `lineno`
/// (1-based), clamped to file bounds; the exact line is highlighted and the
/// character at `cursorpos` marked.
pub fn render_frame(source: &str, lineno: u32, cursorpos: Option<u32>) -> Frame {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    if total == 0 {
        return Frame {
            lines: Vec::new(),
            cursor: None,
            total_lines: 0,
        };
    }

    let target = (lineno.max(1) as usize).min(total);
    let start = target.saturating_sub(CONTEXT_LINES).max(1);
    let end = (target + CONTEXT_LINES).min(total);

    let frame_lines: Vec<FrameLine> = (start..=end)
        .map(|n| FrameLine {
            number: n,
            text: lines[n - 1].to_string(),
            highlighted: n == target,
        })
        .collect();

    let cursor = cursorpos.map(|col| {
        let col = col as usize;
        CursorMark {
            line: target,
            col,
            ch: lines[target - 1].chars().nth(col),
        }
    });

    Frame {
        lines: frame_lines,
        cursor,
        total_lines: total,
    }
}

// crates/server/src/ingest_state.rs
//! Atomic ingestion state for lock-free progress reporting.
//!
//! The ingest background task updates counters while the progress endpoint
//! reads them without contention. Starting a run cancels the previous one
//! and bumps a generation counter; a finished task only applies its results
//! while its generation is still current, so a slow response for a
//! previously selected submission can never overwrite the current one.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use tokio_util::sync::CancellationToken;

/// Which phase the ingest run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IngestStatus {
    /// No run started.
    Idle = 0,
    /// Resolving the author's time-tracking user and projects.
    ResolvingUser = 1,
    /// Fetching heartbeats day by day.
    FetchingDays = 2,
    /// Run finished; results applied to the review session.
    Done = 3,
    /// Run failed (see [`IngestState::error`]). Partial days are discarded.
    Error = 4,
}

impl IngestStatus {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Idle),
            1 => Some(Self::ResolvingUser),
            2 => Some(Self::FetchingDays),
            3 => Some(Self::Done),
            4 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingUser => "resolving_user",
            Self::FetchingDays => "fetching_days",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// Thread-safe progress state for the heartbeat ingest task.
///
/// Counters use [`Ordering::Relaxed`]: readers need eventually visible
/// monotonic values, not cross-field consistency.
pub struct IngestState {
    status: AtomicU8,
    generation: AtomicU64,
    days_total: AtomicUsize,
    days_done: AtomicUsize,
    heartbeats_found: AtomicUsize,
    submission: RwLock<Option<String>>,
    error: RwLock<Option<String>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl IngestState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(IngestStatus::Idle as u8),
            generation: AtomicU64::new(0),
            days_total: AtomicUsize::new(0),
            days_done: AtomicUsize::new(0),
            heartbeats_found: AtomicUsize::new(0),
            submission: RwLock::new(None),
            error: RwLock::new(None),
            cancel: Mutex::new(None),
        }
    }

    /// Begin a run for a submission: cancel the previous run, bump the
    /// generation, reset all counters. Returns the new generation and the
    /// token the run must check at each suspension point.
    pub fn begin(&self, submission_id: &str) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        if let Ok(mut guard) = self.cancel.lock() {
            if let Some(previous) = guard.replace(token.clone()) {
                previous.cancel();
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.days_total.store(0, Ordering::Relaxed);
        self.days_done.store(0, Ordering::Relaxed);
        self.heartbeats_found.store(0, Ordering::Relaxed);
        if let Ok(mut guard) = self.submission.write() {
            *guard = Some(submission_id.to_string());
        }
        if let Ok(mut guard) = self.error.write() {
            *guard = None;
        }
        self.set_status(IngestStatus::ResolvingUser);

        (generation, token)
    }

    /// Whether `generation` is still the latest run.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Relaxed) == generation
    }

    pub fn status(&self) -> IngestStatus {
        IngestStatus::from_u8(self.status.load(Ordering::Relaxed)).unwrap_or(IngestStatus::Error)
    }

    pub fn set_status(&self, status: IngestStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    pub fn days(&self) -> (usize, usize) {
        (
            self.days_done.load(Ordering::Relaxed),
            self.days_total.load(Ordering::Relaxed),
        )
    }

    pub fn set_days(&self, done: usize, total: usize) {
        self.days_done.store(done, Ordering::Relaxed);
        self.days_total.store(total, Ordering::Relaxed);
    }

    pub fn heartbeats_found(&self) -> usize {
        self.heartbeats_found.load(Ordering::Relaxed)
    }

    pub fn set_heartbeats_found(&self, count: usize) {
        self.heartbeats_found.store(count, Ordering::Relaxed);
    }

    pub fn submission(&self) -> Option<String> {
        self.submission.read().ok().and_then(|g| g.clone())
    }

    /// Record an error message (also sets status to [`IngestStatus::Error`]).
    pub fn set_error(&self, message: impl Into<String>) {
        self.set_status(IngestStatus::Error);
        if let Ok(mut guard) = self.error.write() {
            *guard = Some(message.into());
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().ok().and_then(|g| g.clone())
    }
}

impl Default for IngestState {
    fn default() -> Self {
        Self::new()
    }
}

//! Shared data types for the note store and its flush loop.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Flush loop state
// ---------------------------------------------------------------------------

/// Lifecycle state of a note store's flush machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Waiting for the next trigger.
    Idle,
    /// Running pull / stage / commit / push.
    Flushing,
    /// The flush loop has exited.
    Stopped,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Flushing => write!(f, "flushing"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why the flush loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    BufferFull,
    TimerTick,
    ShutdownRequested,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "buffer_full"),
            Self::TimerTick => write!(f, "timer"),
            Self::ShutdownRequested => write!(f, "shutdown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Flush results
// ---------------------------------------------------------------------------

/// Details of a successful flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushReport {
    /// Number of notes in the pushed commit.
    pub count: usize,
    /// SHA of the pushed commit.
    pub commit: String,
    /// Staged paths, in the order they were added.
    pub paths: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Non-error result of a flush.
#[derive(Debug, Clone)]
pub enum FlushOutcome {
    /// A commit with the pending notes was pushed.
    Flushed(FlushReport),
    /// The buffer was empty; nothing was committed or pushed.
    NothingToDo,
}

impl FlushOutcome {
    /// Number of notes pushed (0 for [`FlushOutcome::NothingToDo`]).
    pub fn count(&self) -> usize {
        match self {
            Self::Flushed(report) => report.count,
            Self::NothingToDo => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Aggregate counters across flushes.
#[derive(Debug, Default)]
pub struct FlushStats {
    pub flushes: AtomicU64,
    pub notes_flushed: AtomicU64,
    pub failures: AtomicU64,
    pub consecutive_failures: AtomicU64,
    pub empty_flushes: AtomicU64,
}

/// Point-in-time copy of [`FlushStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushStatsSnapshot {
    pub flushes: u64,
    pub notes_flushed: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub empty_flushes: u64,
}

impl FlushStats {
    pub(crate) fn record_success(&self, count: usize) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.notes_flushed.fetch_add(count as u64, Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub(crate) fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_empty(&self) {
        self.empty_flushes.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> FlushStatsSnapshot {
        FlushStatsSnapshot {
            flushes: self.flushes.load(Ordering::SeqCst),
            notes_flushed: self.notes_flushed.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
            empty_flushes: self.empty_flushes.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_track_consecutive_failures() {
        let stats = FlushStats::default();
        assert_eq!(stats.record_failure(), 1);
        assert_eq!(stats.record_failure(), 2);
        stats.record_success(4);
        stats.record_empty();

        let snap = stats.snapshot();
        assert_eq!(snap.failures, 2);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.flushes, 1);
        assert_eq!(snap.notes_flushed, 4);
        assert_eq!(snap.empty_flushes, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(StoreState::Flushing.to_string(), "flushing");
        assert_eq!(FlushTrigger::BufferFull.to_string(), "buffer_full");
        assert_eq!(FlushOutcome::NothingToDo.count(), 0);
    }
}

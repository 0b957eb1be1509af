//! Run statistics and progress reporting

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Lines between progress log lines
pub const PROGRESS_INTERVAL: u64 = 250_000;

/// Counters for a bulk-corpus run over one file or many.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub files: u64,
    /// Non-blank lines read
    pub lines: u64,
    /// Lines that failed to decode
    pub malformed: u64,
    /// Records that qualified for a write (had a DOI, or cited known works)
    pub candidates: u64,
    /// Rows the store reported as matched or written
    pub matched: u64,
    /// Batches whose store write failed
    pub failed_batches: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn records_per_sec(&self) -> f64 {
        per_sec(self.lines as f64, self.elapsed)
    }

    pub fn mb_per_sec(&self) -> f64 {
        per_sec(self.bytes as f64 / (1024.0 * 1024.0), self.elapsed)
    }

    /// Fold another run's counters into this one.
    pub fn absorb(&mut self, other: &RunStats) {
        self.files += other.files;
        self.lines += other.lines;
        self.malformed += other.malformed;
        self.candidates += other.candidates;
        self.matched += other.matched;
        self.failed_batches += other.failed_batches;
        self.bytes += other.bytes;
        self.elapsed += other.elapsed;
    }

    pub fn log_summary(&self, label: &str) {
        info!(
            run = label,
            files = self.files,
            records = self.lines,
            malformed = self.malformed,
            candidates = self.candidates,
            matched = self.matched,
            failed_batches = self.failed_batches,
            elapsed_secs = %format!("{:.2}", self.elapsed.as_secs_f64()),
            records_per_sec = %format!("{:.0}", self.records_per_sec()),
            mb_per_sec = %format!("{:.2}", self.mb_per_sec()),
            "Run complete"
        );
    }
}

pub(crate) fn per_sec(amount: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        amount / secs
    } else {
        0.0
    }
}

/// Logs a progress line every [`PROGRESS_INTERVAL`] lines.
#[derive(Debug)]
pub struct Progress {
    started: Instant,
    interval: u64,
}

impl Progress {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            interval: PROGRESS_INTERVAL,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Call after each line with the running counters.
    pub fn tick(&self, stats: &RunStats) {
        if stats.lines > 0 && stats.lines % self.interval == 0 {
            info!(
                records = stats.lines,
                records_per_sec = %format!("{:.0}", per_sec(stats.lines as f64, self.elapsed())),
                matched = stats.matched,
                "Progress"
            );
        }
    }
}

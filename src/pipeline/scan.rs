//! Shared loop for scanning work-record files
//!
//! Malformed lines are counted and skipped; an I/O error abandons the rest
//! of the file but keeps what was already processed.

use super::stats::{Progress, RunStats};
use crate::source::{CorpusLayout, FileLines, PartFile, SourceError, Work};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// Per-file consumer of decoded works.
pub trait WorkVisitor {
    fn visit(&mut self, work: Work, stats: &mut RunStats);

    /// Called once after the last line, to flush a partial batch.
    fn finish(&mut self, stats: &mut RunStats);
}

/// Feed each decoded work to the visitor, keeping line counters in `stats`.
pub fn drain<I, V>(works: I, stats: &mut RunStats, visitor: &mut V)
where
    I: IntoIterator<Item = Result<Work, SourceError>>,
    V: WorkVisitor + ?Sized,
{
    let progress = Progress::start();
    for item in works {
        match item {
            Ok(work) => {
                stats.lines += 1;
                visitor.visit(work, stats);
            }
            Err(SourceError::Decode { line, message }) => {
                stats.lines += 1;
                stats.malformed += 1;
                debug!(line, %message, "Skipping malformed line");
            }
            Err(e) => {
                error!(error = %e, "Read failed, abandoning rest of file");
                break;
            }
        }
        progress.tick(stats);
    }
    visitor.finish(stats);
}

/// Open one work file and scan it.
pub fn scan_file<V>(path: &Path, limit: Option<usize>, visitor: &mut V) -> Result<RunStats, SourceError>
where
    V: WorkVisitor + ?Sized,
{
    let started = Instant::now();
    let mut stats = RunStats {
        files: 1,
        bytes: std::fs::metadata(path)?.len(),
        ..RunStats::default()
    };
    let works = FileLines::<Work>::open(path)?.with_limit(limit);
    drain(works, &mut stats, visitor);
    stats.elapsed = started.elapsed();
    Ok(stats)
}

/// Run `per_file` over every part file, logging a summary per file and for
/// the whole corpus. A file that cannot be opened is logged and skipped.
pub fn scan_corpus<F>(layout: &CorpusLayout, label: &str, mut per_file: F) -> RunStats
where
    F: FnMut(&PartFile) -> Result<RunStats, SourceError>,
{
    let started = Instant::now();
    let total_files = layout.parts().len();
    let mut total = RunStats::default();

    for (index, part) in layout.parts().iter().enumerate() {
        info!(
            file = %part.path.display(),
            index = index + 1,
            of = total_files,
            size_mb = %format!("{:.1}", part.size_mb()),
            "Processing file"
        );
        match per_file(part) {
            Ok(stats) => {
                stats.log_summary(&part.path.display().to_string());
                total.absorb(&stats);
            }
            Err(e) => error!(file = %part.path.display(), error = %e, "Skipping unreadable file"),
        }
    }

    total.elapsed = started.elapsed();
    total.log_summary(label);
    total
}

//! Bulk load of the arXiv metadata snapshot

use super::engine::{BatchOutcome, UpsertEngine};
use super::normalize::paper_from_snapshot;
use crate::source::{ArxivRecord, FileLines, SourceError};
use crate::storage::GraphStore;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Counters for one snapshot load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub lines: u64,
    pub malformed: u64,
    /// Decoded records without an id
    pub skipped: u64,
    pub outcome: BatchOutcome,
    pub elapsed: Duration,
}

impl SnapshotStats {
    pub fn papers_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.outcome.updated as f64 / secs
        } else {
            0.0
        }
    }
}

/// Stream snapshot lines through the upsert engine in batches.
///
/// Only a failure to open the file is an error; bad lines and failed
/// batches are counted.
pub fn load_snapshot<S: GraphStore + ?Sized>(
    engine: &UpsertEngine<'_, S>,
    path: &Path,
    limit: Option<usize>,
) -> Result<SnapshotStats, SourceError> {
    info!(
        file = %path.display(),
        batch_size = engine.batch_size(),
        limit = ?limit,
        "Loading snapshot"
    );
    let started = Instant::now();
    let mut stats = SnapshotStats::default();
    let mut batch = Vec::with_capacity(engine.batch_size());

    for item in FileLines::<ArxivRecord>::open(path)?.with_limit(limit) {
        match item {
            Ok(record) => {
                stats.lines += 1;
                match paper_from_snapshot(record) {
                    Some(paper) => batch.push(paper),
                    None => stats.skipped += 1,
                }
            }
            Err(SourceError::Decode { line, message }) => {
                stats.lines += 1;
                stats.malformed += 1;
                debug!(line, %message, "Skipping malformed line");
            }
            Err(e) => {
                error!(error = %e, "Read failed, abandoning rest of snapshot");
                break;
            }
        }

        if batch.len() >= engine.batch_size() {
            stats.outcome += engine.upsert_batch(&batch);
            batch.clear();
            info!(papers = stats.outcome.updated, lines = stats.lines, "Snapshot progress");
        }
    }
    stats.outcome += engine.upsert_batch(&batch);
    stats.elapsed = started.elapsed();

    info!(
        lines = stats.lines,
        papers = stats.outcome.updated,
        malformed = stats.malformed,
        skipped = stats.skipped,
        errors = stats.outcome.errors,
        elapsed_secs = %format!("{:.2}", stats.elapsed.as_secs_f64()),
        papers_per_sec = %format!("{:.0}", stats.papers_per_sec()),
        "Snapshot load complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{OpenStore, SqliteStore};

    #[test]
    fn loads_lines_and_counts_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":"0704.0001","title":"One","categories":"hep-ph","authors_parsed":[["Balazs","C.",""]]}"#,
                "\n",
                "{broken\n",
                r#"{"id":"","title":"No id"}"#,
                "\n",
                r#"{"id":"0704.0002","title":"Two","categories":"math.CO cs.CG"}"#,
                "\n",
            ),
        )
        .unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let engine = UpsertEngine::new(&store, 1);
        let stats = load_snapshot(&engine, &path, None).unwrap();

        assert_eq!(stats.lines, 4);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.outcome.updated, 2);

        let counts = store.counts().unwrap();
        assert_eq!(counts.papers, 2);
        assert_eq!(counts.authors, 1);
        assert_eq!(counts.categories, 3);
        assert_eq!(counts.has_category, 3);
    }

    #[test]
    fn limit_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let lines: String = (0..10).map(|i| format!("{{\"id\":\"{i}\"}}\n")).collect();
        std::fs::write(&path, lines).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let engine = UpsertEngine::new(&store, 100);
        let stats = load_snapshot(&engine, &path, Some(3)).unwrap();
        assert_eq!(stats.outcome.updated, 3);
    }
}

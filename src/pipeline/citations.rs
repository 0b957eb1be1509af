//! Citation edge construction
//!
//! A work contributes CITES edges only when its own id is a known Paper
//! `openalex_id` and it lists references; each reference that is also
//! known becomes one edge. Works whose Paper is added later are not
//! revisited.

use super::matcher::KeySet;
use super::scan::{drain, scan_corpus, scan_file, WorkVisitor};
use super::stats::RunStats;
use crate::model::{PaperColumn, Relationship};
use crate::source::{CorpusLayout, SourceError, Work};
use crate::storage::{EdgeKeys, GraphStore, WriteOp};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Default citation pairs per store batch
pub const DEFAULT_CITATION_BATCH_SIZE: usize = 1000;

/// `(citing, cited)` pairs a work yields against the known keys.
pub fn citation_pairs(work: &Work, known: &KeySet) -> Vec<EdgeKeys> {
    if !known.contains(&work.id) {
        return Vec::new();
    }
    work.references()
        .iter()
        .filter(|cited| known.contains(cited))
        .map(|cited| EdgeKeys::new(work.id.clone(), cited.clone()))
        .collect()
}

/// Builds CITES edges from work records.
pub struct CitationBuilder<'a, S: ?Sized> {
    store: &'a S,
    known: &'a KeySet,
    batch_size: usize,
}

impl<'a, S: GraphStore + ?Sized> CitationBuilder<'a, S> {
    /// `known` must be a snapshot of the `openalex_id` column.
    pub fn new(store: &'a S, known: &'a KeySet, batch_size: usize) -> Self {
        if known.column() != PaperColumn::OpenalexId {
            warn!(column = known.column().as_str(), "Citation key set is not openalex_id");
        }
        if known.is_empty() {
            warn!("No papers carry an openalex_id; run identifier matching first");
        }
        Self {
            store,
            known,
            batch_size: batch_size.max(1),
        }
    }

    pub fn build_works<I>(&self, works: I) -> RunStats
    where
        I: IntoIterator<Item = Result<Work, SourceError>>,
    {
        let started = Instant::now();
        let mut stats = RunStats::default();
        drain(works, &mut stats, &mut self.visitor());
        stats.elapsed = started.elapsed();
        stats
    }

    pub fn build_file(&self, path: &Path, limit: Option<usize>) -> Result<RunStats, SourceError> {
        info!(
            file = %path.display(),
            known_papers = self.known.len(),
            batch_size = self.batch_size,
            "Building citations"
        );
        scan_file(path, limit, &mut self.visitor())
    }

    pub fn build_corpus(&self, layout: &CorpusLayout, limit: Option<usize>) -> RunStats {
        scan_corpus(layout, "citation building", |part| self.build_file(&part.path, limit))
    }

    fn visitor(&self) -> CitationBatch<'_, 'a, S> {
        CitationBatch {
            builder: self,
            pending: Vec::with_capacity(self.batch_size),
        }
    }

    fn flush(&self, pending: &mut Vec<EdgeKeys>, stats: &mut RunStats) {
        if pending.is_empty() {
            return;
        }
        let ops = [WriteOp::MergeEdges {
            kind: Relationship::Cites,
            pairs: std::mem::take(pending),
        }];
        match self.store.write_batch(&ops) {
            Ok(counts) => {
                let written = counts.first().copied().unwrap_or(0);
                debug!(pairs = ops[0].len(), written, "Citation batch applied");
                stats.matched += written as u64;
            }
            Err(e) => {
                error!(batch_size = ops[0].len(), error = %e, "Citation batch failed");
                stats.failed_batches += 1;
            }
        }
    }
}

struct CitationBatch<'b, 'a, S: ?Sized> {
    builder: &'b CitationBuilder<'a, S>,
    pending: Vec<EdgeKeys>,
}

impl<S: GraphStore + ?Sized> WorkVisitor for CitationBatch<'_, '_, S> {
    fn visit(&mut self, work: Work, stats: &mut RunStats) {
        if !work.has_references() {
            return;
        }
        let pairs = citation_pairs(&work, self.builder.known);
        if pairs.is_empty() {
            return;
        }
        stats.candidates += 1;
        for pair in pairs {
            self.pending.push(pair);
            if self.pending.len() >= self.builder.batch_size {
                self.builder.flush(&mut self.pending, stats);
            }
        }
    }

    fn finish(&mut self, stats: &mut RunStats) {
        self.builder.flush(&mut self.pending, stats);
    }
}

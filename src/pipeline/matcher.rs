//! Identifier matching: DOI → `openalex_id`
//!
//! Scans work records, and for each one whose DOI belongs to a Paper, sets
//! that Paper's `openalex_id`. Two strategies decide where the DOI lookup
//! happens; both end in the same store write, which only touches Papers
//! whose `openalex_id` is still unset, so they produce the same graph.

use super::normalize::normalize_doi;
use super::scan::{scan_corpus, scan_file, WorkVisitor};
use super::stats::RunStats;
use crate::model::PaperColumn;
use crate::source::{CorpusLayout, SourceError, Work};
use crate::storage::{GraphStore, IdAssignment, StorageResult, WriteOp};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info};

/// Default candidates per store batch
pub const DEFAULT_MATCH_BATCH_SIZE: usize = 25_000;

/// Where DOI lookups happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Send every candidate; the store filters and writes in one statement.
    #[default]
    StoreSide,
    /// Load the store's DOI set once, filter locally, send only hits.
    ClientSide,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StoreSide => "store",
            Self::ClientSide => "client",
        })
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" | "store-side" => Ok(Self::StoreSide),
            "client" | "client-side" => Ok(Self::ClientSide),
            other => Err(format!("unknown match strategy '{}' (expected store or client)", other)),
        }
    }
}

/// Snapshot of one Paper key column, loaded once and never refreshed.
#[derive(Debug, Clone)]
pub struct KeySet {
    column: PaperColumn,
    keys: HashSet<String>,
}

impl KeySet {
    pub fn load<S: GraphStore + ?Sized>(store: &S, column: PaperColumn) -> StorageResult<Self> {
        let started = Instant::now();
        let keys = store.project_paper_keys(column)?;
        info!(
            column = column.as_str(),
            keys = keys.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded key set"
        );
        Ok(Self { column, keys })
    }

    pub fn from_keys(column: PaperColumn, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            column,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn column(&self) -> PaperColumn {
        self.column
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The write a work would produce, if it has both an id and a DOI.
pub fn candidate(work: &Work) -> Option<IdAssignment> {
    let openalex_id = work.id.trim();
    let doi = normalize_doi(work.doi.as_deref()?);
    if openalex_id.is_empty() || doi.is_empty() {
        return None;
    }
    Some(IdAssignment {
        doi: doi.to_string(),
        openalex_id: openalex_id.to_string(),
    })
}

/// Matches work records against Paper DOIs.
pub struct IdentifierMatcher<'a, S: ?Sized> {
    store: &'a S,
    strategy: MatchStrategy,
    batch_size: usize,
    known_dois: Option<KeySet>,
}

impl<'a, S: GraphStore + ?Sized> IdentifierMatcher<'a, S> {
    /// Client-side matching loads the DOI set here, once per matcher.
    pub fn new(store: &'a S, strategy: MatchStrategy, batch_size: usize) -> StorageResult<Self> {
        let known_dois = match strategy {
            MatchStrategy::ClientSide => Some(KeySet::load(store, PaperColumn::Doi)?),
            MatchStrategy::StoreSide => None,
        };
        Ok(Self {
            store,
            strategy,
            batch_size: batch_size.max(1),
            known_dois,
        })
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Match every work from an in-memory or streaming source.
    pub fn match_works<I>(&self, works: I) -> RunStats
    where
        I: IntoIterator<Item = Result<Work, SourceError>>,
    {
        let started = Instant::now();
        let mut stats = RunStats::default();
        super::scan::drain(works, &mut stats, &mut self.visitor());
        stats.elapsed = started.elapsed();
        stats
    }

    /// Match one (possibly compressed) work file.
    pub fn match_file(&self, path: &Path, limit: Option<usize>) -> Result<RunStats, SourceError> {
        info!(
            file = %path.display(),
            strategy = %self.strategy,
            batch_size = self.batch_size,
            "Matching identifiers"
        );
        scan_file(path, limit, &mut self.visitor())
    }

    /// Match every part file of a corpus.
    pub fn match_corpus(&self, layout: &CorpusLayout, limit: Option<usize>) -> RunStats {
        scan_corpus(layout, "identifier matching", |part| {
            self.match_file(&part.path, limit)
        })
    }

    fn visitor(&self) -> MatchBatch<'_, 'a, S> {
        MatchBatch {
            matcher: self,
            pending: Vec::with_capacity(self.batch_size.min(DEFAULT_MATCH_BATCH_SIZE)),
        }
    }

    fn flush(&self, pending: &mut Vec<IdAssignment>, stats: &mut RunStats) {
        if pending.is_empty() {
            return;
        }
        let ops = [WriteOp::AssignOpenalexIds(std::mem::take(pending))];
        match self.store.write_batch(&ops) {
            Ok(counts) => {
                let matched = counts.first().copied().unwrap_or(0);
                debug!(candidates = ops[0].len(), matched, "Identifier batch applied");
                stats.matched += matched as u64;
            }
            Err(e) => {
                error!(batch_size = ops[0].len(), error = %e, "Identifier batch failed");
                stats.failed_batches += 1;
            }
        }
    }
}

/// Pending assignments for one scan
struct MatchBatch<'m, 'a, S: ?Sized> {
    matcher: &'m IdentifierMatcher<'a, S>,
    pending: Vec<IdAssignment>,
}

impl<S: GraphStore + ?Sized> WorkVisitor for MatchBatch<'_, '_, S> {
    fn visit(&mut self, work: Work, stats: &mut RunStats) {
        let Some(assignment) = candidate(&work) else {
            return;
        };
        stats.candidates += 1;
        if let Some(known) = &self.matcher.known_dois {
            if !known.contains(&assignment.doi) {
                return;
            }
        }
        self.pending.push(assignment);
        if self.pending.len() >= self.matcher.batch_size {
            self.matcher.flush(&mut self.pending, stats);
        }
    }

    fn finish(&mut self, stats: &mut RunStats) {
        self.matcher.flush(&mut self.pending, stats);
    }
}

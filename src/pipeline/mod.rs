//! Reconciliation pipelines
//!
//! - `normalize`: source records → `PaperRecord`
//! - `engine`: batch upsert of Papers, Authors, Categories and their edges
//! - `matcher`: DOI → `openalex_id` matching over the work corpus
//! - `citations`: CITES edges between matched Papers
//! - `snapshot`: bulk load of the arXiv metadata snapshot
//! - `scan`, `stats`: shared file loop and run counters

mod citations;
mod engine;
mod matcher;
pub mod normalize;
mod scan;
mod snapshot;
mod stats;

pub use citations::{citation_pairs, CitationBuilder, DEFAULT_CITATION_BATCH_SIZE};
pub use engine::{build_ops, segments, BatchOutcome, UpsertEngine, DEFAULT_BATCH_SIZE};
pub use matcher::{candidate, IdentifierMatcher, KeySet, MatchStrategy, DEFAULT_MATCH_BATCH_SIZE};
pub use normalize::{normalize_doi, paper_from_harvest, paper_from_snapshot, parse_date};
pub use scan::{drain, scan_corpus, scan_file, WorkVisitor};
pub use snapshot::{load_snapshot, SnapshotStats};
pub use stats::{Progress, RunStats, PROGRESS_INTERVAL};
pub(crate) use stats::per_sec;

//! Storage trait definitions

use crate::model::{GraphCounts, LedgerEntry, PaperColumn, Relationship};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Scalar fields written by a Paper merge.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRow {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub submitter: String,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
    pub report_no: Option<String>,
    pub license: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
}

/// One `doi → openalex_id` write produced by identifier matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdAssignment {
    pub doi: String,
    pub openalex_id: String,
}

/// A relationship row addressed by its endpoint keys.
///
/// Which key each side refers to depends on the [`Relationship`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKeys {
    pub from: String,
    pub to: String,
}

impl EdgeKeys {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A bulk write. Each variant carries every parameter row for one
/// statement, so a whole batch costs one round trip per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Merge-by-`arxiv_id`, then overwrite scalar fields.
    MergePapers(Vec<PaperRow>),
    /// Merge Author nodes by name.
    MergeAuthors(Vec<String>),
    /// Merge Category nodes by code.
    MergeCategories(Vec<String>),
    /// Detach-delete Papers by `arxiv_id`. Affected count is the number
    /// of Papers that existed.
    DeletePapers(Vec<String>),
    /// Delete every edge of `kind` incident to each listed Paper.
    ClearEdges {
        kind: Relationship,
        arxiv_ids: Vec<String>,
    },
    /// Merge edges by endpoint keys. Pairs whose endpoints are not both
    /// present are skipped; affected count is the number of pairs matched.
    MergeEdges {
        kind: Relationship,
        pairs: Vec<EdgeKeys>,
    },
    /// Set `openalex_id` on Papers whose `doi` matches and whose
    /// `openalex_id` is unset. Affected count is the number of Papers set.
    AssignOpenalexIds(Vec<IdAssignment>),
}

impl WriteOp {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::MergePapers(_) => "merge_papers",
            Self::MergeAuthors(_) => "merge_authors",
            Self::MergeCategories(_) => "merge_categories",
            Self::DeletePapers(_) => "delete_papers",
            Self::ClearEdges { .. } => "clear_edges",
            Self::MergeEdges { .. } => "merge_edges",
            Self::AssignOpenalexIds(_) => "assign_openalex_ids",
        }
    }

    /// Number of parameter rows
    pub fn len(&self) -> usize {
        match self {
            Self::MergePapers(rows) => rows.len(),
            Self::MergeAuthors(rows) | Self::MergeCategories(rows) | Self::DeletePapers(rows) => rows.len(),
            Self::ClearEdges { arxiv_ids, .. } => arxiv_ids.len(),
            Self::MergeEdges { pairs, .. } => pairs.len(),
            Self::AssignOpenalexIds(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for graph storage backends
///
/// Implementations must be thread-safe (Send + Sync) so that runs over
/// separate corpus files can share one store.
pub trait GraphStore: Send + Sync {
    // === Writes ===

    /// Apply the operations in order inside one transaction.
    ///
    /// Either every operation commits or none does. Returns the affected
    /// count of each operation, in the same order.
    fn write_batch(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>>;

    // === Reads ===

    /// Every non-empty value of a Paper key column.
    fn project_paper_keys(&self, column: PaperColumn) -> StorageResult<HashSet<String>>;

    /// Latest `update_date` over all Papers.
    fn max_paper_update_date(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Node and edge totals.
    fn counts(&self) -> StorageResult<GraphCounts>;

    /// Whether a Paper with this `arxiv_id` exists.
    fn has_paper(&self, arxiv_id: &str) -> StorageResult<bool>;

    /// Author names with a WROTE edge to the Paper, sorted.
    fn authors_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>>;

    /// Category codes the Paper has a HAS_CATEGORY edge to, sorted.
    fn categories_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>>;

    // === Update ledger ===

    /// Load the ledger entry, if one was ever recorded.
    fn load_ledger(&self) -> StorageResult<Option<LedgerEntry>>;

    /// Upsert the ledger entry, incrementing its run count.
    fn record_ledger(&self, timestamp: DateTime<Utc>) -> StorageResult<LedgerEntry>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

//! Node and relationship vocabulary of the citation graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relationship types. Each is multiplicity-free: at most one edge of a
/// type between an ordered pair of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// Author → Paper, endpoints keyed by author name and `arxiv_id`
    Wrote,
    /// Paper → Category, endpoints keyed by `arxiv_id` and category code
    HasCategory,
    /// Paper → Paper, endpoints keyed by `openalex_id` on both sides
    Cites,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrote => "WROTE",
            Self::HasCategory => "HAS_CATEGORY",
            Self::Cites => "CITES",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Paper key column that can be projected out of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperColumn {
    ArxivId,
    Doi,
    OpenalexId,
}

impl PaperColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArxivId => "arxiv_id",
            Self::Doi => "doi",
            Self::OpenalexId => "openalex_id",
        }
    }
}

/// The singleton record of the last successful harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub last_update_time: DateTime<Utc>,
    /// Number of successful runs recorded so far
    pub update_count: u64,
}

/// Node and edge totals, used for status reports and test assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub papers: usize,
    pub papers_with_doi: usize,
    pub papers_with_openalex_id: usize,
    pub authors: usize,
    pub categories: usize,
    pub wrote: usize,
    pub has_category: usize,
    pub cites: usize,
}

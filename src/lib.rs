//! PaperWeave: bibliographic metadata reconciliation
//!
//! Keeps a graph of papers, authors, categories and citations consistent
//! with two external sources: an OAI-PMH repository harvested
//! incrementally, and a bulk corpus of academic-work records.
//!
//! # Core Concepts
//!
//! - **Papers** are keyed by `arxiv_id`, with optional unique `doi` and
//!   `openalex_id` secondary keys
//! - **Batches** of records are applied as one transaction; every write is
//!   a merge, so replaying a batch is harmless
//! - **Reconciliation**: re-upserting a Paper with a new author or category
//!   list replaces its WROTE or HAS_CATEGORY edges
//! - **Ledger**: the harvest high-water mark, advanced only after a
//!   complete harvest
//!
//! # Example
//!
//! ```
//! use paperweave::{AuthorName, GraphStore, OpenStore, PaperRecord, SqliteStore, UpsertEngine};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let engine = UpsertEngine::new(&store, 1000);
//! let paper = PaperRecord::active("1001.0001")
//!     .with_title("A")
//!     .with_author(AuthorName::from_creator("Jane Q. Doe"));
//! engine.upsert_batch(&[paper]);
//! assert_eq!(store.authors_of("1001.0001").unwrap(), vec!["Jane Q. Doe"]);
//! ```

pub mod config;
pub mod harvest;
mod model;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod update;

pub use config::{ConfigError, Settings};
pub use harvest::{HarvestError, HarvestRecord, HttpTransport, OaiClient, Transport};
pub use model::{
    AuthorName, GraphCounts, LedgerEntry, PaperColumn, PaperRecord, RecordStatus, Relationship,
};
pub use pipeline::{
    BatchOutcome, CitationBuilder, IdentifierMatcher, KeySet, MatchStrategy, RunStats, UpsertEngine,
};
pub use storage::{GraphStore, OpenStore, SqliteStore, StorageError, StorageResult};
pub use update::{RunSummary, UpdateError, UpdateLedger, Updater};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

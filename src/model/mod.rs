//! Records, relationships and ledger types shared by every pipeline

mod graph;
mod paper;

pub use graph::{GraphCounts, LedgerEntry, PaperColumn, Relationship};
pub use paper::{AuthorName, PaperRecord, RecordStatus};

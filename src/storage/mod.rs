//! Storage backends
//!
//! Pipelines talk to the graph through the `GraphStore` trait: batched
//! bulk writes applied in one transaction, plus the handful of projections
//! the matchers and the ledger need. The implementation is `SqliteStore`.

mod sqlite;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    EdgeKeys, GraphStore, IdAssignment, OpenStore, PaperRow, StorageError, StorageResult, WriteOp,
};

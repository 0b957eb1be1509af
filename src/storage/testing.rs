//! Store wrapper that fails chosen `write_batch` calls

use super::{GraphStore, OpenStore, SqliteStore, StorageError, StorageResult, WriteOp};
use crate::model::{GraphCounts, LedgerEntry, PaperColumn};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to an in-memory `SqliteStore`, except that the listed
/// `write_batch` calls (0-based) fail without touching it.
pub(crate) struct FailingStore {
    inner: SqliteStore,
    fail_on: Vec<usize>,
    calls: AtomicUsize,
}

impl FailingStore {
    pub(crate) fn new(fail_on: &[usize]) -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            fail_on: fail_on.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GraphStore for FailingStore {
    fn write_batch(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("write_batch call {} refused", call),
            )));
        }
        self.inner.write_batch(ops)
    }

    fn project_paper_keys(&self, column: PaperColumn) -> StorageResult<HashSet<String>> {
        self.inner.project_paper_keys(column)
    }

    fn max_paper_update_date(&self) -> StorageResult<Option<DateTime<Utc>>> {
        self.inner.max_paper_update_date()
    }

    fn counts(&self) -> StorageResult<GraphCounts> {
        self.inner.counts()
    }

    fn has_paper(&self, arxiv_id: &str) -> StorageResult<bool> {
        self.inner.has_paper(arxiv_id)
    }

    fn authors_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>> {
        self.inner.authors_of(arxiv_id)
    }

    fn categories_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>> {
        self.inner.categories_of(arxiv_id)
    }

    fn load_ledger(&self) -> StorageResult<Option<LedgerEntry>> {
        self.inner.load_ledger()
    }

    fn record_ledger(&self, timestamp: DateTime<Utc>) -> StorageResult<LedgerEntry> {
        self.inner.record_ledger(timestamp)
    }
}

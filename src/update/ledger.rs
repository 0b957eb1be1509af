//! Update ledger: the harvest high-water mark

use crate::model::LedgerEntry;
use crate::storage::{GraphStore, StorageResult};
use chrono::{DateTime, Duration, Utc};

/// Look-back used when neither a ledger entry nor any Paper date exists
pub fn fallback_window() -> Duration {
    Duration::days(7)
}

/// Which tier produced the harvest start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkSource {
    /// The recorded ledger entry
    Ledger,
    /// Latest Paper `update_date`
    PaperDates,
    /// Fixed window before now
    Fallback,
}

/// Where the next incremental harvest starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub timestamp: DateTime<Utc>,
    pub source: WatermarkSource,
}

/// Reads and advances the ledger kept in the store.
pub struct UpdateLedger<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> UpdateLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The ledger timestamp if one was recorded, else the latest Paper
    /// `update_date`, else `now` minus the fallback window.
    pub fn last_update_timestamp(&self, now: DateTime<Utc>) -> StorageResult<Watermark> {
        if let Some(entry) = self.store.load_ledger()? {
            return Ok(Watermark {
                timestamp: entry.last_update_time,
                source: WatermarkSource::Ledger,
            });
        }
        if let Some(latest) = self.store.max_paper_update_date()? {
            return Ok(Watermark {
                timestamp: latest,
                source: WatermarkSource::PaperDates,
            });
        }
        Ok(Watermark {
            timestamp: now - fallback_window(),
            source: WatermarkSource::Fallback,
        })
    }

    /// Record a successful run, incrementing the run count.
    pub fn record(&self, timestamp: DateTime<Utc>) -> StorageResult<LedgerEntry> {
        self.store.record_ledger(timestamp)
    }

    pub fn entry(&self) -> StorageResult<Option<LedgerEntry>> {
        self.store.load_ledger()
    }
}

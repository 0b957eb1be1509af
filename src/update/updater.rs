//! Incremental update orchestration

use super::ledger::{UpdateLedger, Watermark};
use crate::harvest::{HarvestError, Harvester, ListRequest, OaiClient, RetryPolicy, Transport};
use crate::model::{LedgerEntry, PaperRecord};
use crate::pipeline::{paper_from_harvest, per_sec, BatchOutcome, UpsertEngine, DEFAULT_BATCH_SIZE};
use crate::storage::{GraphStore, StorageError};
use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that end an update run before the ledger advances
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("harvest failed: {0}")]
    Harvest(#[from] HarvestError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Harvest arguments and batching for an update run
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub metadata_prefix: String,
    pub set: Option<String>,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            metadata_prefix: ListRequest::DEFAULT_METADATA_PREFIX.to_string(),
            set: None,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of one successful update run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub updated: usize,
    pub deleted: usize,
    pub errors: usize,
    /// Records received from the repository
    pub harvested: u64,
    /// Harvested records that could not be mapped
    pub skipped: u64,
    pub pages: u64,
    pub elapsed: Duration,
    /// Ledger after the run
    #[serde(skip)]
    pub ledger: Option<LedgerEntry>,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.updated + self.deleted
    }

    /// Harvested records per second of wall time
    pub fn records_per_sec(&self) -> f64 {
        per_sec(self.harvested as f64, self.elapsed)
    }
}

/// Harvests changes since the ledger watermark and applies them.
pub struct Updater<'a, S: ?Sized, T> {
    store: &'a S,
    client: &'a OaiClient<T>,
    options: UpdateOptions,
}

impl<'a, S: GraphStore + ?Sized, T: Transport> Updater<'a, S, T> {
    pub fn new(store: &'a S, client: &'a OaiClient<T>, options: UpdateOptions) -> Self {
        Self {
            store,
            client,
            options,
        }
    }

    /// Where the next run starts from.
    pub fn watermark(&self) -> Result<Watermark, UpdateError> {
        Ok(UpdateLedger::new(self.store).last_update_timestamp(Utc::now())?)
    }

    /// Harvest, upsert, then advance the ledger to this run's start time.
    ///
    /// Any error leaves the ledger untouched, so the next run covers the
    /// same window again.
    pub async fn run_incremental_update(&self) -> Result<RunSummary, UpdateError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let ledger = UpdateLedger::new(self.store);
        let watermark = ledger.last_update_timestamp(started_at)?;
        info!(
            from = %watermark.timestamp,
            source = ?watermark.source,
            set = ?self.options.set,
            "Starting incremental update"
        );

        let request = ListRequest::new(self.options.metadata_prefix.clone())
            .since(watermark.timestamp.date_naive())
            .set(self.options.set.clone());
        let mut harvester = Harvester::new(self.client, request, self.options.retry.clone());
        let engine = UpsertEngine::new(self.store, self.options.batch_size);

        let mut outcome = BatchOutcome::default();
        let mut skipped = 0u64;
        while let Some(records) = harvester.next_batch().await? {
            let papers: Vec<PaperRecord> = records.iter().filter_map(paper_from_harvest).collect();
            skipped += (records.len() - papers.len()) as u64;

            let mut page_outcome = BatchOutcome::default();
            for chunk in papers.chunks(engine.batch_size()) {
                page_outcome += engine.upsert_batch(chunk);
            }
            info!(
                updated = page_outcome.updated,
                deleted = page_outcome.deleted,
                errors = page_outcome.errors,
                "Processed batch"
            );
            outcome += page_outcome;
        }

        let entry = ledger.record(started_at)?;
        let stats = harvester.stats();
        let summary = RunSummary {
            updated: outcome.updated,
            deleted: outcome.deleted,
            errors: outcome.errors,
            harvested: stats.records,
            skipped,
            pages: stats.pages,
            elapsed: clock.elapsed(),
            ledger: Some(entry),
        };

        if summary.errors > 0 {
            warn!(errors = summary.errors, "Update finished with failed batches");
        }
        info!(
            updated = summary.updated,
            deleted = summary.deleted,
            errors = summary.errors,
            harvested = summary.harvested,
            elapsed_secs = %format!("{:.1}", summary.elapsed.as_secs_f64()),
            records_per_sec = %format!("{:.0}", summary.records_per_sec()),
            "Incremental update completed"
        );
        Ok(summary)
    }
}

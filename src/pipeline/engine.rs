//! Batch upsert engine
//!
//! Turns a bounded batch of `PaperRecord`s into one `write_batch` call.
//!
//! The batch is first cut into segments in input order. A segment ends
//! before a key it already holds, or before a delete that follows an active
//! record, so each segment is some deletes then some actives over distinct
//! keys. Each segment then becomes:
//!
//! 1. detach-delete the `deleted` records
//! 2. merge Papers, then Authors and Categories
//! 3. clear WROTE / HAS_CATEGORY on every Paper whose record supplied a
//!    non-empty author / category list
//! 4. merge the new edges
//!
//! Applying segments in order is the same as applying the records one by
//! one, so the graph does not depend on batch size. The store applies all
//! segments of a batch in one transaction, so a failed batch leaves nothing
//! behind and is reported as errors only.

use crate::model::{PaperRecord, Relationship};
use crate::storage::{EdgeKeys, GraphStore, PaperRow, WriteOp};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::AddAssign;
use tracing::{debug, error};

/// Default records per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Outcome of one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Active records written
    pub updated: usize,
    /// Papers that existed and were deleted
    pub deleted: usize,
    /// Records in batches that failed
    pub errors: usize,
}

impl AddAssign for BatchOutcome {
    fn add_assign(&mut self, other: Self) {
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.errors += other.errors;
    }
}

/// Cut a batch into segments that can each be applied as one unit.
pub fn segments(records: &[PaperRecord]) -> Vec<&[PaperRecord]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut keys: HashSet<&str> = HashSet::new();
    let mut has_active = false;
    for (i, record) in records.iter().enumerate() {
        let repeated = keys.contains(record.arxiv_id.as_str());
        if repeated || (record.is_deleted() && has_active) {
            out.push(&records[start..i]);
            start = i;
            keys.clear();
            has_active = false;
        }
        keys.insert(record.arxiv_id.as_str());
        has_active |= !record.is_deleted();
    }
    if start < records.len() {
        out.push(&records[start..]);
    }
    out
}

fn paper_row(record: &PaperRecord) -> PaperRow {
    PaperRow {
        arxiv_id: record.arxiv_id.clone(),
        title: record.title.clone(),
        abstract_text: record.abstract_text.clone(),
        submitter: record.submitter.clone(),
        journal_ref: record.journal_ref.clone(),
        doi: record.doi.clone(),
        report_no: record.report_no.clone(),
        license: record.license.clone(),
        update_date: record.update_date,
    }
}

/// Build the ordered operations for one batch. Empty operations are left out.
pub fn build_ops(records: &[PaperRecord]) -> Vec<WriteOp> {
    segments(records).into_iter().flat_map(segment_ops).collect()
}

fn segment_ops(records: &[PaperRecord]) -> Vec<WriteOp> {
    let mut deletes = Vec::new();
    let mut papers = Vec::new();
    let mut authors: Vec<String> = Vec::new();
    let mut seen_authors: HashSet<String> = HashSet::new();
    let mut categories: Vec<String> = Vec::new();
    let mut seen_categories: HashSet<String> = HashSet::new();
    let mut clear_wrote = Vec::new();
    let mut clear_categories = Vec::new();
    let mut wrote = Vec::new();
    let mut has_category = Vec::new();

    for record in records {
        if record.is_deleted() {
            deletes.push(record.arxiv_id.clone());
            continue;
        }
        papers.push(paper_row(record));

        let names = record.author_names();
        if !names.is_empty() {
            clear_wrote.push(record.arxiv_id.clone());
        }
        for name in names {
            wrote.push(EdgeKeys::new(name.clone(), record.arxiv_id.clone()));
            if seen_authors.insert(name.clone()) {
                authors.push(name);
            }
        }

        let codes = record.category_codes();
        if !codes.is_empty() {
            clear_categories.push(record.arxiv_id.clone());
        }
        for code in codes {
            has_category.push(EdgeKeys::new(record.arxiv_id.clone(), code.clone()));
            if seen_categories.insert(code.clone()) {
                categories.push(code);
            }
        }
    }

    let ops = vec![
        WriteOp::DeletePapers(deletes),
        WriteOp::MergePapers(papers),
        WriteOp::MergeAuthors(authors),
        WriteOp::MergeCategories(categories),
        WriteOp::ClearEdges {
            kind: Relationship::Wrote,
            arxiv_ids: clear_wrote,
        },
        WriteOp::ClearEdges {
            kind: Relationship::HasCategory,
            arxiv_ids: clear_categories,
        },
        WriteOp::MergeEdges {
            kind: Relationship::Wrote,
            pairs: wrote,
        },
        WriteOp::MergeEdges {
            kind: Relationship::HasCategory,
            pairs: has_category,
        },
    ];
    ops.into_iter().filter(|op| !op.is_empty()).collect()
}

/// Applies record batches to a store.
pub struct UpsertEngine<'a, S: ?Sized> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: GraphStore + ?Sized> UpsertEngine<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Apply one batch atomically. Store errors are logged and counted.
    pub fn upsert_batch(&self, records: &[PaperRecord]) -> BatchOutcome {
        if records.is_empty() {
            return BatchOutcome::default();
        }

        let ops = build_ops(records);
        let active: usize = ops
            .iter()
            .map(|op| match op {
                WriteOp::MergePapers(rows) => rows.len(),
                _ => 0,
            })
            .sum();

        match self.store.write_batch(&ops) {
            Ok(counts) => {
                let deleted: usize = ops
                    .iter()
                    .zip(&counts)
                    .filter(|(op, _)| matches!(op, WriteOp::DeletePapers(_)))
                    .map(|(_, n)| *n)
                    .sum();
                debug!(records = records.len(), updated = active, deleted, "Batch applied");
                BatchOutcome {
                    updated: active,
                    deleted,
                    errors: 0,
                }
            }
            Err(e) => {
                error!(batch_size = records.len(), error = %e, "Batch upsert failed");
                BatchOutcome {
                    updated: 0,
                    deleted: 0,
                    errors: records.len(),
                }
            }
        }
    }

    /// Split a stream of records into batches and apply each.
    pub fn upsert_all<I>(&self, records: I) -> BatchOutcome
    where
        I: IntoIterator<Item = PaperRecord>,
    {
        let mut total = BatchOutcome::default();
        let mut batch = Vec::with_capacity(self.batch_size);
        for record in records {
            batch.push(record);
            if batch.len() >= self.batch_size {
                total += self.upsert_batch(&batch);
                batch.clear();
            }
        }
        total += self.upsert_batch(&batch);
        total
    }
}

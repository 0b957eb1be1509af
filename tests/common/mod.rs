//! Common test utilities for PaperWeave scenario tests
//!
//! Store helpers and record builders live here; fixture corpora and
//! OAI-PMH response bodies are in the submodules.
#![allow(dead_code)]

pub mod corpus;
pub mod oai;

pub use corpus::{snapshot_line, work, write_part, write_snapshot};
pub use oai::{list_records_page, no_records_match, OaiRecord};

use paperweave::{AuthorName, GraphCounts, GraphStore, OpenStore, PaperRecord, SqliteStore};

/// A fresh in-memory store.
pub fn memory_store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("Failed to open in-memory store")
}

/// An active paper with the given creators and categories.
pub fn paper(id: &str, creators: &[&str], categories: &[&str]) -> PaperRecord {
    let mut record = PaperRecord::active(id).with_title(format!("Title of {}", id));
    for creator in creators {
        record = record.with_author(AuthorName::from_creator(creator));
    }
    for code in categories {
        record = record.with_category(*code);
    }
    record
}

/// A deterministic mixed workload of `n` records.
///
/// Authors and categories are drawn from small pools so nodes are shared
/// across papers. Every 7th record has a DOI and every 50th record deletes
/// an earlier paper. Every 89th record repeats the id from three records
/// back with a new title only, and every 97th repeats an earlier id with
/// different authors.
pub fn mixed_workload(n: usize) -> Vec<PaperRecord> {
    let authors = ["Ada Lovelace", "Alan Turing", "Grace Hopper", "Emmy Noether", "Kurt Godel"];
    let categories = ["cs.AI", "cs.LG", "math.CO", "hep-th", "astro-ph"];

    (0..n)
        .map(|i| {
            if i > 0 && i % 50 == 0 {
                return PaperRecord::deleted(format!("2401.{:05}", i - 25));
            }
            if i > 0 && i % 89 == 0 {
                return PaperRecord::active(format!("2401.{:05}", i - 3)).with_title(format!("Revised {}", i));
            }
            let id = if i > 0 && i % 97 == 0 {
                format!("2401.{:05}", i - 40)
            } else {
                format!("2401.{:05}", i)
            };
            let mut record = paper(
                &id,
                &[authors[i % authors.len()], authors[(i / 3) % authors.len()]],
                &[categories[i % categories.len()]],
            );
            if i % 7 == 0 {
                record = record.with_doi(format!("10.1000/{}", id));
            }
            record
        })
        .collect()
}

pub fn counts(store: &SqliteStore) -> GraphCounts {
    store.counts().expect("Failed to read counts")
}

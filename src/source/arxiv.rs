//! arXiv metadata snapshot records
//!
//! The snapshot is one JSON object per line with hyphenated keys
//! (`journal-ref`, `report-no`) and a pre-split `authors_parsed` list of
//! `[last, first, suffix]` triples.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArxivRecord {
    pub id: String,
    #[serde(default)]
    pub submitter: Option<String>,
    /// Free-text author line; `authors_parsed` is what the graph uses
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default, rename = "journal-ref")]
    pub journal_ref: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, rename = "report-no")]
    pub report_no: Option<String>,
    /// Space-separated category codes
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub update_date: Option<String>,
    #[serde(default)]
    pub authors_parsed: Option<Vec<Vec<String>>>,
}

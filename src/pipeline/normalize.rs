//! Source records → `PaperRecord`

use crate::harvest::HarvestRecord;
use crate::model::{AuthorName, PaperRecord};
use crate::source::ArxivRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// DOI URL prefixes stripped before comparison or write
const DOI_PREFIXES: [&str; 3] = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/"];

/// Strip one DOI URL prefix and surrounding whitespace.
///
/// Idempotent: a bare DOI comes back unchanged.
pub fn normalize_doi(doi: &str) -> &str {
    let doi = doi.trim();
    DOI_PREFIXES
        .iter()
        .find_map(|prefix| doi.strip_prefix(prefix))
        .map(str::trim)
        .unwrap_or(doi)
}

/// Parse an upstream date: RFC 3339, naive `YYYY-MM-DDTHH:MM:SS`, or
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Map one snapshot line. `None` when the record has no id.
pub fn paper_from_snapshot(record: ArxivRecord) -> Option<PaperRecord> {
    let arxiv_id = record.id.trim();
    if arxiv_id.is_empty() {
        return None;
    }

    let mut paper = PaperRecord::active(arxiv_id);
    paper.title = record.title.unwrap_or_default();
    paper.abstract_text = record.abstract_text.unwrap_or_default();
    paper.submitter = record.submitter.unwrap_or_default();
    paper.journal_ref = non_blank(record.journal_ref);
    paper.doi = non_blank(record.doi).map(|doi| normalize_doi(&doi).to_string());
    paper.report_no = non_blank(record.report_no);
    paper.license = non_blank(record.license);
    paper.update_date = record.update_date.as_deref().and_then(parse_date);
    paper.authors = record
        .authors_parsed
        .unwrap_or_default()
        .iter()
        .map(|parts| AuthorName::from_parts(parts))
        .collect();
    paper.categories = record
        .categories
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    Some(paper)
}

/// Map one harvested record.
///
/// Field mapping: `title` → title, `description` → abstract, first
/// `creator` → submitter, every `creator` → author (last token is the
/// surname), header sets → categories, datestamp → update date.
/// `None` when the record has no usable id.
pub fn paper_from_harvest(record: &HarvestRecord) -> Option<PaperRecord> {
    let arxiv_id = record.arxiv_id.trim();
    if arxiv_id.is_empty() {
        return None;
    }
    if record.is_deleted() {
        return Some(PaperRecord::deleted(arxiv_id));
    }

    let creators = record.values("creator");
    let mut paper = PaperRecord::active(arxiv_id);
    paper.title = record.first("title").unwrap_or_default().to_string();
    paper.abstract_text = record.first("description").unwrap_or_default().to_string();
    paper.submitter = creators.first().copied().unwrap_or_default().to_string();
    paper.update_date = parse_date(&record.datestamp);
    paper.authors = creators.iter().map(|c| AuthorName::from_creator(c)).collect();
    paper.categories = record.sets.clone();
    Some(paper)
}

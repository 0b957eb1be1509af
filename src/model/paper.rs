//! Paper records as they enter the upsert engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an upstream record describes a live paper or a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Deleted,
}

/// An author name split into its parsed components.
///
/// The graph identifies authors by [`AuthorName::display_name`], so two
/// records that spell a name the same way always land on the same node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub last: String,
    pub first: String,
    pub suffix: String,
}

impl AuthorName {
    pub fn new(last: impl Into<String>, first: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            last: last.into(),
            first: first.into(),
            suffix: suffix.into(),
        }
    }

    /// Build from an `authors_parsed` entry: `[last, first, suffix, ...]`.
    ///
    /// Missing trailing components are treated as empty.
    pub fn from_parts(parts: &[String]) -> Self {
        let part = |i: usize| parts.get(i).cloned().unwrap_or_default();
        Self::new(part(0), part(1), part(2))
    }

    /// Split a free-text creator string: the last whitespace token is the
    /// surname, everything before it the given names.
    ///
    /// Multi-word surnames ("van der Berg") come out wrong; kept as is.
    pub fn from_creator(creator: &str) -> Self {
        let tokens: Vec<&str> = creator.split_whitespace().collect();
        match tokens.split_last() {
            Some((last, [])) => Self::new(*last, "", ""),
            Some((last, given)) => Self::new(*last, given.join(" "), ""),
            None => Self::default(),
        }
    }

    /// Normalized key: `first last suffix`, whitespace collapsed.
    ///
    /// Empty when every component is blank; such authors are skipped.
    pub fn display_name(&self) -> String {
        [self.first.as_str(), self.last.as_str(), self.suffix.as_str()]
            .iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A normalized paper record, independent of which source produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Primary key
    pub arxiv_id: String,
    pub status: RecordStatus,
    pub title: String,
    pub abstract_text: String,
    pub submitter: String,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
    pub report_no: Option<String>,
    pub license: Option<String>,
    /// Upstream last-modified date
    pub update_date: Option<DateTime<Utc>>,
    pub authors: Vec<AuthorName>,
    /// Category codes, in source order
    pub categories: Vec<String>,
}

impl PaperRecord {
    /// An active record carrying only its key.
    pub fn active(arxiv_id: impl Into<String>) -> Self {
        Self {
            arxiv_id: arxiv_id.into(),
            status: RecordStatus::Active,
            title: String::new(),
            abstract_text: String::new(),
            submitter: String::new(),
            journal_ref: None,
            doi: None,
            report_no: None,
            license: None,
            update_date: None,
            authors: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// A deletion marker for the given key.
    pub fn deleted(arxiv_id: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Deleted,
            ..Self::active(arxiv_id)
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RecordStatus::Deleted
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_author(mut self, author: AuthorName) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_category(mut self, code: impl Into<String>) -> Self {
        self.categories.push(code.into());
        self
    }

    pub fn with_update_date(mut self, date: DateTime<Utc>) -> Self {
        self.update_date = Some(date);
        self
    }

    /// Author keys for this record, blanks dropped, duplicates removed.
    pub fn author_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for author in &self.authors {
            let name = author.display_name();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Category codes, trimmed, blanks dropped, duplicates removed.
    pub fn category_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for code in self.categories.iter().map(|c| c.trim()) {
            if !code.is_empty() && !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_first_last_suffix() {
        let name = AuthorName::new("Doe", "Jane Q.", "Jr");
        assert_eq!(name.display_name(), "Jane Q. Doe Jr");
    }

    #[test]
    fn display_name_collapses_whitespace() {
        let name = AuthorName::new("  Doe ", "Jane   Q.", "");
        assert_eq!(name.display_name(), "Jane Q. Doe");
    }

    #[test]
    fn blank_author_has_empty_display_name() {
        assert_eq!(AuthorName::new(" ", "", "").display_name(), "");
    }

    #[test]
    fn creator_last_token_is_surname() {
        let name = AuthorName::from_creator("Jane Q. Doe");
        assert_eq!(name.last, "Doe");
        assert_eq!(name.first, "Jane Q.");
        assert_eq!(name.display_name(), "Jane Q. Doe");
    }

    #[test]
    fn single_token_creator_is_surname_only() {
        let name = AuthorName::from_creator("Plato");
        assert_eq!(name, AuthorName::new("Plato", "", ""));
    }

    #[test]
    fn from_parts_tolerates_short_entries() {
        let name = AuthorName::from_parts(&["Doe".to_string()]);
        assert_eq!(name.display_name(), "Doe");
    }

    #[test]
    fn author_names_skip_blanks_and_duplicates() {
        let record = PaperRecord::active("1001.0001")
            .with_author(AuthorName::new("Doe", "Jane", ""))
            .with_author(AuthorName::new("", "", ""))
            .with_author(AuthorName::new("Doe", "Jane", ""));
        assert_eq!(record.author_names(), vec!["Jane Doe".to_string()]);
    }

    #[test]
    fn category_codes_trimmed_and_unique() {
        let record = PaperRecord::active("x")
            .with_category(" cs.AI")
            .with_category("")
            .with_category("cs.AI");
        assert_eq!(record.category_codes(), vec!["cs.AI".to_string()]);
    }
}

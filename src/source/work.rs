//! Work records from the bulk academic-work corpus

use serde::Deserialize;

/// One academic work. Only the fields the pipelines read are decoded;
/// everything else on the line is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Work {
    /// Global work identifier (URL form, e.g. `https://openalex.org/W123`)
    pub id: String,
    /// DOI, usually in `https://doi.org/...` form
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    referenced_works: Option<Vec<String>>,
}

impl Work {
    /// Identifiers of the works this one cites; empty when absent or null.
    pub fn references(&self) -> &[String] {
        self.referenced_works.as_deref().unwrap_or(&[])
    }

    pub fn has_references(&self) -> bool {
        !self.references().is_empty()
    }
}

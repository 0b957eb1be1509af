//! Harvest error types

use thiserror::Error;

/// Error code the protocol uses for an empty selective listing
pub const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// Errors from one harvest request, or from the paging loop giving up.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The repository answered with a protocol `error` element.
    #[error("OAI-PMH error [{code}]: {message}")]
    Protocol { code: String, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("XML parse error: {0}")]
    Xml(String),

    /// The response parsed but lacked a required element.
    #[error("malformed {verb} response: {detail}")]
    Malformed { verb: &'static str, detail: String },

    /// The paging loop hit its consecutive-failure bound.
    #[error("harvest stopped after {attempts} consecutive failures: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<HarvestError>,
    },
}

impl HarvestError {
    /// True for the protocol's "nothing changed in this window" answer.
    pub fn is_no_records_match(&self) -> bool {
        matches!(self, Self::Protocol { code, .. } if code == NO_RECORDS_MATCH)
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

/// Result type for harvest operations
pub type HarvestResult<T> = Result<T, HarvestError>;

//! Record source readers
//!
//! Decode line-oriented, optionally gzip-compressed record streams into
//! typed records. Malformed lines surface as per-line errors that callers
//! count and skip.

mod arxiv;
mod corpus;
mod lines;
mod work;

pub use arxiv::ArxivRecord;
pub use corpus::{CorpusLayout, CorpusOverview, PartFile, PARTITION_PREFIX, RECORDS_PER_MB};
pub use lines::{open_lines, FileLines, JsonLines, SourceError};
pub use work::Work;

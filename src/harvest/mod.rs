//! Harvest protocol client
//!
//! Retrieves records changed since a date from an OAI-PMH repository:
//! - `OaiClient` issues throttled requests through a `Transport`
//! - `xml` parses responses, turning protocol `error` elements into
//!   `HarvestError::Protocol`
//! - `Harvester` pages through a listing by continuation token, retrying a
//!   failed page under a `RetryPolicy`

mod client;
mod error;
mod harvester;
mod policy;
mod record;
mod transport;
pub mod xml;

pub use client::{ListRequest, OaiClient, DATE_FORMAT};
pub use error::{HarvestError, HarvestResult, NO_RECORDS_MATCH};
pub use harvester::{Cursor, HarvestStats, Harvester};
pub use policy::{RequestThrottle, RetryPolicy};
pub use record::{FieldValue, HarvestRecord, RecordPage};
pub use transport::{
    user_agent, HttpTransport, Params, ScriptedTransport, Transport, DEFAULT_CONTACT,
    REQUEST_TIMEOUT,
};

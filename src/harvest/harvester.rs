//! Incremental harvesting state machine
//!
//! A [`Harvester`] walks one selective listing page by page. Its cursor is
//! the only state between pages: the selective arguments before the first
//! page, then the last continuation token. A failed request leaves the
//! cursor where it was, so the retry loop replays exactly the page that
//! failed. Dropping the harvester cancels the listing; the protocol keeps
//! no server-side state besides the token.

use super::client::{ListRequest, OaiClient};
use super::error::{HarvestError, HarvestResult};
use super::policy::RetryPolicy;
use super::record::{HarvestRecord, RecordPage};
use super::transport::Transport;
use tracing::{info, warn};

/// Where the next request resumes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Nothing fetched yet: send the selective arguments.
    Initial,
    /// Send this continuation token alone.
    Resume(String),
    /// Listing complete.
    Done,
}

/// Counters for one listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub pages: u64,
    pub records: u64,
    pub deleted: u64,
    /// Failed attempts, all retried or fatal
    pub failures: u64,
}

/// Drives one `ListRecords` listing to completion.
pub struct Harvester<'a, T> {
    client: &'a OaiClient<T>,
    request: ListRequest,
    policy: RetryPolicy,
    cursor: Cursor,
    consecutive_failures: u32,
    stats: HarvestStats,
}

impl<'a, T: Transport> Harvester<'a, T> {
    pub fn new(client: &'a OaiClient<T>, request: ListRequest, policy: RetryPolicy) -> Self {
        Self {
            client,
            request,
            policy,
            cursor: Cursor::Initial,
            consecutive_failures: 0,
            stats: HarvestStats::default(),
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.cursor == Cursor::Done
    }

    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    /// Fetch the page at the cursor, once.
    ///
    /// On success the cursor advances to the returned token (or `Done`);
    /// on error it is unchanged. `Ok(None)` once the listing is complete.
    pub async fn next_page(&mut self) -> HarvestResult<Option<RecordPage>> {
        let result = match &self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Initial => match self.client.list_records(&self.request).await {
                // An empty selective window is reported as an error by the protocol.
                Err(e) if e.is_no_records_match() => Ok(RecordPage::default()),
                other => other,
            },
            Cursor::Resume(token) => self.client.resume_records(token).await,
        };

        let page = result?;
        self.cursor = match &page.resumption_token {
            Some(token) => Cursor::Resume(token.clone()),
            None => Cursor::Done,
        };
        self.stats.pages += 1;
        self.stats.records += page.records.len() as u64;
        self.stats.deleted += page.records.iter().filter(|r| r.is_deleted()).count() as u64;
        Ok(Some(page))
    }

    /// Next non-empty batch of records, retrying failed pages per the policy.
    ///
    /// Pages that carry no records but a token are followed transparently.
    /// `Ok(None)` once the listing is complete. Fails only with
    /// [`HarvestError::RetriesExhausted`].
    pub async fn next_batch(&mut self) -> HarvestResult<Option<Vec<HarvestRecord>>> {
        loop {
            match self.next_page().await {
                Ok(None) => {
                    info!(
                        pages = self.stats.pages,
                        records = self.stats.records,
                        "Harvest listing complete"
                    );
                    return Ok(None);
                }
                Ok(Some(page)) => {
                    self.consecutive_failures = 0;
                    if page.records.is_empty() {
                        continue;
                    }
                    info!(
                        records = page.records.len(),
                        total = self.stats.records,
                        "Harvested page"
                    );
                    return Ok(Some(page.records));
                }
                Err(e) => {
                    self.stats.failures += 1;
                    self.consecutive_failures += 1;
                    if !self.policy.should_retry(self.consecutive_failures) {
                        return Err(HarvestError::RetriesExhausted {
                            attempts: self.consecutive_failures,
                            last: Box::new(e),
                        });
                    }
                    warn!(
                        error = %e,
                        attempt = self.consecutive_failures,
                        cooldown_secs = self.policy.cooldown.as_secs(),
                        "Harvest request failed, retrying same page after cooldown"
                    );
                    tokio::time::sleep(self.policy.cooldown).await;
                }
            }
        }
    }
}

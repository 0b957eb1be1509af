//! OAI-PMH protocol client

use super::error::HarvestResult;
use super::policy::RequestThrottle;
use super::record::RecordPage;
use super::transport::{Params, Transport};
use super::xml;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Date format of `from` / `until`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Selective-harvest arguments of the first `ListRecords` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub metadata_prefix: String,
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub set: Option<String>,
}

impl ListRequest {
    pub const DEFAULT_METADATA_PREFIX: &'static str = "oai_dc";

    pub fn new(metadata_prefix: impl Into<String>) -> Self {
        Self {
            metadata_prefix: metadata_prefix.into(),
            from: None,
            until: None,
            set: None,
        }
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.until = Some(date);
        self
    }

    pub fn set(mut self, set: Option<String>) -> Self {
        self.set = set.filter(|s| !s.is_empty());
        self
    }

    fn params(&self) -> Params {
        let mut params: Params = vec![
            ("verb", "ListRecords".to_string()),
            ("metadataPrefix", self.metadata_prefix.clone()),
        ];
        if let Some(from) = self.from {
            params.push(("from", from.format(DATE_FORMAT).to_string()));
        }
        if let Some(until) = self.until {
            params.push(("until", until.format(DATE_FORMAT).to_string()));
        }
        if let Some(set) = &self.set {
            params.push(("set", set.clone()));
        }
        params
    }
}

impl Default for ListRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_METADATA_PREFIX)
    }
}

/// Protocol client over a [`Transport`].
///
/// Every request, of any verb, passes through the shared throttle.
pub struct OaiClient<T> {
    transport: T,
    throttle: RequestThrottle,
}

impl<T: Transport> OaiClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_throttle(transport, RequestThrottle::default())
    }

    pub fn with_throttle(transport: T, throttle: RequestThrottle) -> Self {
        Self {
            transport,
            throttle,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn requests_issued(&self) -> u64 {
        self.throttle.issued()
    }

    async fn request(&self, params: Params) -> HarvestResult<String> {
        self.throttle.acquire().await;
        debug!(?params, "OAI-PMH request");
        self.transport.get(&params).await
    }

    /// Repository description: child element → text.
    pub async fn identify(&self) -> HarvestResult<BTreeMap<String, String>> {
        let body = self.request(vec![("verb", "Identify".to_string())]).await?;
        xml::parse_identify(&body)
    }

    /// Supported metadata formats, one map per format.
    pub async fn list_metadata_formats(&self) -> HarvestResult<Vec<BTreeMap<String, String>>> {
        let body = self
            .request(vec![("verb", "ListMetadataFormats".to_string())])
            .await?;
        xml::parse_entries(&body, "metadataFormat")
    }

    /// Available sets, one map per set.
    pub async fn list_sets(&self) -> HarvestResult<Vec<BTreeMap<String, String>>> {
        let body = self.request(vec![("verb", "ListSets".to_string())]).await?;
        xml::parse_entries(&body, "set")
    }

    /// First page of a selective listing.
    pub async fn list_records(&self, request: &ListRequest) -> HarvestResult<RecordPage> {
        let body = self.request(request.params()).await?;
        xml::parse_list_records(&body)
    }

    /// Follow-up page: the token is the only argument.
    pub async fn resume_records(&self, token: &str) -> HarvestResult<RecordPage> {
        let body = self
            .request(vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", token.to_string()),
            ])
            .await?;
        xml::parse_list_records(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::transport::ScriptedTransport;

    const EMPTY_PAGE: &str = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords/></OAI-PMH>"#;

    #[tokio::test]
    async fn first_request_carries_selective_arguments() {
        let client = OaiClient::new(ScriptedTransport::new().with_body(EMPTY_PAGE));
        let request = ListRequest::default()
            .since(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .set(Some("cs".to_string()));
        client.list_records(&request).await.unwrap();

        let sent = &client.transport().requests()[0];
        assert_eq!(
            sent,
            &vec![
                ("verb", "ListRecords".to_string()),
                ("metadataPrefix", "oai_dc".to_string()),
                ("from", "2024-01-02".to_string()),
                ("set", "cs".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn resume_sends_only_the_token() {
        let client = OaiClient::new(ScriptedTransport::new().with_body(EMPTY_PAGE));
        client.resume_records("abc|123").await.unwrap();

        let sent = &client.transport().requests()[0];
        assert_eq!(
            sent,
            &vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", "abc|123".to_string()),
            ]
        );
    }

    #[test]
    fn params_carry_date_window_and_set() {
        let request = ListRequest::new("arXiv")
            .since(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .until(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
            .set(Some("physics:hep-th".to_string()));
        assert_eq!(
            request.params(),
            vec![
                ("verb", "ListRecords".to_string()),
                ("metadataPrefix", "arXiv".to_string()),
                ("from", "2024-01-02".to_string()),
                ("until", "2024-01-31".to_string()),
                ("set", "physics:hep-th".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn until_only_request_omits_from() {
        let client = OaiClient::new(ScriptedTransport::new().with_body(EMPTY_PAGE));
        let request = ListRequest::default().until(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        client.list_records(&request).await.unwrap();

        let sent = &client.transport().requests()[0];
        assert!(sent.iter().all(|(key, _)| *key != "from" && *key != "resumptionToken"));
        assert!(sent.contains(&("until", "2024-05-06".to_string())));
    }

    #[tokio::test]
    async fn empty_set_filter_is_dropped() {
        let request = ListRequest::default().set(Some(String::new()));
        assert_eq!(request.set, None);
    }
}

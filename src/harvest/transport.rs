//! HTTP transport for harvest requests
//!
//! The client only needs "GET the base URL with these query parameters and
//! give me the body". `HttpTransport` does that with reqwest; tests script
//! responses with `ScriptedTransport`.

use super::error::{HarvestError, HarvestResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Query parameters of one request, in order
pub type Params = Vec<(&'static str, String)>;

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default contact when no e-mail is configured
pub const DEFAULT_CONTACT: &str = "contact-via-github-issues";

/// Transport seam for harvest requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET and return the response body.
    ///
    /// Non-success statuses are errors.
    async fn get(&self, params: &Params) -> HarvestResult<String>;
}

/// User-Agent identifying the harvester and its operator.
///
/// Values containing `@` become `mailto:` links.
pub fn user_agent(contact: &str) -> String {
    let contact = if contact.contains('@') {
        format!("mailto:{}", contact)
    } else {
        contact.to_string()
    };
    format!(
        "PaperWeave/{} (https://github.com/paperweave/paperweave; {})",
        crate::VERSION,
        contact
    )
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, contact: &str) -> HarvestResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent(contact))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, params: &Params) -> HarvestResult<String> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Transport that replays queued responses and records every request.
///
/// An exhausted script answers with an HTTP 503.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<HarvestResult<String>>>,
    requests: Mutex<Vec<Params>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response body.
    pub fn with_body(self, body: impl Into<String>) -> Self {
        self.push(Ok(body.into()));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, error: HarvestError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: HarvestResult<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Every request issued so far
    pub fn requests(&self) -> Vec<Params> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, params: &Params) -> HarvestResult<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.clone());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(HarvestError::Http {
                    status: 503,
                    body: "script exhausted".to_string(),
                })
            })
    }
}

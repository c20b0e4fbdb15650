//! HTTP transport for the management and pricing APIs
//!
//! [`Transport`] is the seam between the crawl logic and the network so the
//! pager and traversal can be driven by an in-memory transport in tests.
//! [`ReqwestTransport`] adds an explicit per-request timeout and bounded
//! retries for transient failures.

use adfcost_core::error::{AdfCostError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON-over-HTTP operations the crawler needs
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body with an `Authorization` header and decode the JSON reply
    async fn post_json(&self, url: &str, auth_header: &str, body: &Value) -> Result<Value>;

    /// GET a JSON document, optionally authenticated
    async fn get_json(&self, url: &str, auth_header: Option<&str>) -> Result<Value>;
}

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds, fails permanently, or retries run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what, e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// [`Transport`] backed by `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout and retry policy
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("adfcost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, retry })
    }

    /// The underlying client, shared with token sources that need raw form posts
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn send_once(&self, url: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no reason").to_string()
            } else {
                body
            };
            return Err(AdfCostError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message,
            });
        }

        debug!("{} {}", status.as_u16(), url);
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, url: &str, auth_header: &str, body: &Value) -> Result<Value> {
        self.retry
            .run(url, || {
                let request = self
                    .client
                    .post(url)
                    .header(reqwest::header::AUTHORIZATION, auth_header)
                    .json(body);
                self.send_once(url, request)
            })
            .await
    }

    async fn get_json(&self, url: &str, auth_header: Option<&str>) -> Result<Value> {
        self.retry
            .run(url, || {
                let mut request = self.client.get(url);
                if let Some(value) = auth_header {
                    request = request.header(reqwest::header::AUTHORIZATION, value);
                }
                self.send_once(url, request)
            })
            .await
    }
}

//! Continuation-token pagination
//!
//! The run-query endpoints return at most one page per POST plus an opaque
//! `continuationToken` while more remain. [`PagedCollectionFetcher`] keeps
//! re-posting the same filter with the latest token until none comes back.
//! Any failed page aborts the whole listing: a silently truncated listing
//! would undercount usage.

use crate::credential::CredentialManager;
use crate::transport::Transport;
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::Credential;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Body field carrying the continuation token
const CONTINUATION_TOKEN: &str = "continuationToken";

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Page<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(default, rename = "continuationToken")]
    continuation_token: Option<String>,
}

/// Every record of a listing, in arrival order
#[derive(Debug)]
pub struct Paged<T> {
    pub records: Vec<T>,
    /// Number of requests issued
    pub pages: usize,
    /// Credential used for the final request
    pub credential: Credential,
}

/// Drains a paginated POST endpoint
#[derive(Clone)]
pub struct PagedCollectionFetcher {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialManager>,
}

impl PagedCollectionFetcher {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<CredentialManager>) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// Fetch every page of `endpoint` filtered by `body`
    ///
    /// The credential is re-validated before each page, so a listing that
    /// outlives one token continues with the next. A continuation token the
    /// server already handed out fails the listing instead of looping.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Map<String, Value>,
    ) -> Result<Paged<T>> {
        let mut request_body = body.clone();
        request_body.remove(CONTINUATION_TOKEN);
        let mut records = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut page = 0;

        loop {
            page += 1;
            let credential = self.credentials.current().await?;

            let response = self
                .transport
                .post_json(
                    endpoint,
                    credential.auth_header_value(),
                    &Value::Object(request_body.clone()),
                )
                .await
                .map_err(|e| Self::page_error(endpoint, page, e))?;

            let parsed: Page<T> = serde_json::from_value(response)
                .map_err(|e| Self::page_error(endpoint, page, e.into()))?;

            debug!(
                "Page {} of {}: {} records",
                page,
                endpoint,
                parsed.value.len()
            );
            records.extend(parsed.value);

            match parsed.continuation_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(Self::page_error(
                            endpoint,
                            page,
                            AdfCostError::UnexpectedResponse(format!(
                                "continuation token '{token}' was already returned"
                            )),
                        ));
                    }
                    request_body.insert(CONTINUATION_TOKEN.to_string(), Value::String(token));
                }
                None => {
                    return Ok(Paged {
                        records,
                        pages: page,
                        credential,
                    });
                }
            }
        }
    }

    fn page_error(endpoint: &str, page: usize, source: AdfCostError) -> AdfCostError {
        match source {
            // Credential failures are reported as such, not as a paging problem
            AdfCostError::Authentication(_) => source,
            other => AdfCostError::Pagination {
                endpoint: endpoint.to_string(),
                page,
                source: Box::new(other),
            },
        }
    }
}

//! Azure Resource Manager endpoints for one data factory

use crate::credential::CredentialManager;
use crate::transport::Transport;
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::DateWindow;
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use tracing::debug;

/// Public Azure management endpoint
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
/// Data Factory REST API version
pub const API_VERSION: &str = "2018-06-01";

/// Subscription / resource group / factory triple the job runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryScope {
    base_url: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
}

impl FactoryScope {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        factory_name: impl Into<String>,
    ) -> Self {
        Self {
            base_url: MANAGEMENT_ENDPOINT.to_string(),
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            factory_name: factory_name.into(),
        }
    }

    /// Point at a different management endpoint (sovereign clouds, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn factory_path(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataFactory/factories/{}",
            self.base_url, self.subscription_id, self.resource_group, self.factory_name
        )
    }

    /// Factory resource (GET)
    pub fn factory_url(&self) -> String {
        format!("{}?api-version={}", self.factory_path(), API_VERSION)
    }

    /// Pipeline-run query (POST)
    pub fn pipeline_runs_url(&self) -> String {
        format!(
            "{}/queryPipelineRuns?api-version={}",
            self.factory_path(),
            API_VERSION
        )
    }

    /// Activity-run query for one pipeline run (POST)
    pub fn activity_runs_url(&self, run_id: &str) -> String {
        format!(
            "{}/pipelineruns/{}/queryActivityruns?api-version={}",
            self.factory_path(),
            run_id,
            API_VERSION
        )
    }
}

/// Request body filtering a run query to the window
pub fn window_filter(window: &DateWindow) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(
        "lastUpdatedAfter".to_string(),
        Value::String(window.after().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    body.insert(
        "lastUpdatedBefore".to_string(),
        Value::String(window.before().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    body
}

/// Region display name the factory is deployed in, without spaces
pub async fn fetch_factory_location(
    transport: &dyn Transport,
    credentials: &CredentialManager,
    scope: &FactoryScope,
) -> Result<String> {
    let credential = credentials.current().await?;
    let url = scope.factory_url();
    let factory = transport
        .get_json(&url, Some(credential.auth_header_value()))
        .await?;

    let location = factory
        .get("location")
        .and_then(Value::as_str)
        .ok_or_else(|| AdfCostError::Config(format!("factory resource at {url} has no location")))?;

    debug!("Factory {} is in {}", scope.factory_name, location);
    Ok(location.to_string())
}

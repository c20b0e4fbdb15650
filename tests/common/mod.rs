//! Common test utilities and helpers for adfcost tests
//!
//! A scripted in-memory transport stands in for the management API and the
//! rate catalog, so whole jobs run without a network. The unit tests in
//! `adfcost-client` keep their own copy since `#[cfg(test)]` items are not
//! visible here.

#![allow(dead_code)]

use adfcost::job::JobConfig;
use adfcost_client::credential::{CredentialManager, TokenSource};
use adfcost_client::endpoints::FactoryScope;
use adfcost_client::transport::Transport;
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::{Credential, DateWindow};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Global mutex to serialize environment variable modifications in tests
pub static ENV_MUTEX: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Catalog URL the scripted transport answers for
pub const CATALOG_URL: &str = "https://prices.test/data-factory/calculator/";

/// Offer keys in the order the categories appear in the report
pub const OFFER_KEYS: [&str; 11] = [
    "data-pipeline-orchestration-azure-ir",
    "data-pipeline-orchestration-self-hosted-ir",
    "data-pipeline-data-movement-azure-ir",
    "data-pipeline-pipeline-activity-azure-ir",
    "data-pipeline-external-activity-azure-ir",
    "data-pipeline-data-movement-self-hosted-ir",
    "data-pipeline-pipeline-activity-self-hosted-ir",
    "data-pipeline-external-activity-self-hosted-ir",
    "data-flow-general-purpose",
    "data-flow-compute-optimized",
    "data-flow-memory-optimized",
];

/// One canned reply
pub enum Reply {
    Json(Value),
    Status(u16),
}

/// A request the transport saw
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub url: String,
    pub auth_header: Option<String>,
    pub body: Option<Value>,
}

/// Transport that replays queued replies per URL
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests whose URL contains `fragment`
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.seen()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    fn next(&self, request: SeenRequest) -> Result<Value> {
        let url = request.url.clone();
        self.seen.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(AdfCostError::Http {
                status,
                url,
                message: "scripted failure".to_string(),
            }),
            None => Err(AdfCostError::Http {
                status: 404,
                url,
                message: "no scripted reply".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, auth_header: &str, body: &Value) -> Result<Value> {
        self.next(SeenRequest {
            url: url.to_string(),
            auth_header: Some(auth_header.to_string()),
            body: Some(body.clone()),
        })
    }

    async fn get_json(&self, url: &str, auth_header: Option<&str>) -> Result<Value> {
        self.next(SeenRequest {
            url: url.to_string(),
            auth_header: auth_header.map(str::to_string),
            body: None,
        })
    }
}

/// Token source issuing numbered tokens with a fixed lifetime
pub struct NumberedTokens {
    issued: AtomicUsize,
    lifetime: Duration,
}

impl NumberedTokens {
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            issued: AtomicUsize::new(0),
            lifetime,
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for NumberedTokens {
    fn default() -> Self {
        Self::with_lifetime(Duration::hours(1))
    }
}

#[async_trait]
impl TokenSource for NumberedTokens {
    async fn fetch_credential(&self) -> Result<Credential> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::bearer(&format!("token-{n}"), Utc::now() + self.lifetime))
    }

    fn name(&self) -> &'static str {
        "numbered"
    }
}

/// Token source that always fails
pub struct RejectingTokens;

#[async_trait]
impl TokenSource for RejectingTokens {
    async fn fetch_credential(&self) -> Result<Credential> {
        Err(AdfCostError::Http {
            status: 401,
            url: "https://login.test/token".to_string(),
            message: "invalid_client".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

pub fn credentials() -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(Arc::new(NumberedTokens::default())))
}

pub fn test_scope() -> FactoryScope {
    FactoryScope::new("sub-1", "rg-data", "adf-test").with_base_url("https://management.test")
}

pub fn test_window() -> DateWindow {
    DateWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

pub fn job_config(concurrency: usize) -> JobConfig {
    JobConfig {
        scope: test_scope(),
        window: test_window(),
        region: None,
        concurrency,
    }
}

/// A pipeline run as returned by `queryPipelineRuns`
pub fn run_json(run_id: &str, pipeline: &str) -> Value {
    json!({
        "runId": run_id,
        "pipelineName": pipeline,
        "runStart": "2024-01-10T06:00:00Z",
        "status": "Succeeded"
    })
}

/// Builder for activity runs as returned by `queryActivityruns`
pub struct ActivityBuilder {
    runtime: String,
    activity_type: String,
    durations: Vec<(String, f64, String)>,
}

impl ActivityBuilder {
    pub fn azure(activity_type: &str) -> Self {
        Self {
            runtime: "AutoResolveIntegrationRuntime (East US)".to_string(),
            activity_type: activity_type.to_string(),
            durations: Vec::new(),
        }
    }

    pub fn self_hosted(activity_type: &str) -> Self {
        Self {
            runtime: "SelfHostedRuntime".to_string(),
            activity_type: activity_type.to_string(),
            durations: Vec::new(),
        }
    }

    pub fn duration(mut self, meter_type: &str, duration: f64, unit: &str) -> Self {
        self.durations
            .push((meter_type.to_string(), duration, unit.to_string()));
        self
    }

    pub fn build(self) -> Value {
        let billable: Vec<Value> = self
            .durations
            .into_iter()
            .map(|(meter, duration, unit)| {
                json!({ "meterType": meter, "duration": duration, "unit": unit })
            })
            .collect();
        json!({
            "activityRunId": "00000000-0000-0000-0000-000000000000",
            "status": "Succeeded",
            "output": {
                "effectiveIntegrationRuntime": self.runtime,
                "billingReference": {
                    "activityType": self.activity_type,
                    "billableDuration": billable
                }
            }
        })
    }
}

/// Catalog pricing every offer at `value` in the given region and at twice
/// that in West Europe
pub fn catalog_json(display_name: &str, slug: &str, value: f64) -> Value {
    let mut offers = Map::new();
    for key in OFFER_KEYS {
        offers.insert(
            key.to_string(),
            json!({ "prices": { slug: { "value": value }, "europe-west": { "value": value * 2.0 } } }),
        );
    }
    json!({
        "regions": [
            { "DisplayName": "West Europe", "slug": "europe-west" },
            { "DisplayName": display_name, "slug": slug }
        ],
        "offers": offers
    })
}

/// Script the factory resource GET
pub fn script_factory(transport: &ScriptedTransport, location: &str) {
    transport.push(
        &test_scope().factory_url(),
        Reply::Json(json!({ "name": "adf-test", "location": location })),
    );
}

/// Script a standard factory: `runs` pipeline runs, each with two Azure
/// copy activities of 1.5 DIU-hours and one self-hosted pipeline activity
/// of 0.25 hours
pub fn script_standard_factory(transport: &ScriptedTransport, runs: usize) {
    let scope = test_scope();
    script_factory(transport, "EastUS");
    transport.push(
        CATALOG_URL,
        Reply::Json(catalog_json("East US", "us-east", 1.0)),
    );

    let run_values: Vec<Value> = (0..runs)
        .map(|i| run_json(&format!("run-{i}"), &format!("pipeline-{}", i % 2)))
        .collect();
    transport.push(
        &scope.pipeline_runs_url(),
        Reply::Json(json!({ "value": run_values })),
    );

    for i in 0..runs {
        transport.push(
            &scope.activity_runs_url(&format!("run-{i}")),
            Reply::Json(json!({
                "value": [
                    ActivityBuilder::azure("DataMovement").duration("AzureIR", 1.5, "DIUHours").build(),
                    ActivityBuilder::azure("DataMovement").duration("AzureIR", 1.5, "DIUHours").build(),
                    ActivityBuilder::self_hosted("PipelineActivity")
                        .duration("SelfHostedIR", 0.25, "Hours")
                        .build(),
                ]
            })),
        );
    }
}

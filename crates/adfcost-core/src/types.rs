//! Core domain types for adfcost
//!
//! This module contains the fundamental types used throughout the adfcost
//! crates: the query window, the bearer credential, the records returned by
//! the Data Factory run-query endpoints, and the billing categories a run's
//! consumption is bucketed into.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AdfCostError, Result};

/// Inclusive time window runs are queried over
///
/// # Examples
/// ```
/// use adfcost_core::types::DateWindow;
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
/// let window = DateWindow::from_day_offsets(now, 30, 0).unwrap();
/// assert!(window.after() <= window.before());
/// assert_eq!(window.before(), now);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    after: DateTime<Utc>,
    before: DateTime<Utc>,
}

impl DateWindow {
    /// Create a window, rejecting `after > before`
    pub fn new(after: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self> {
        if after > before {
            return Err(AdfCostError::InvalidDateWindow(format!(
                "start {} is after end {}",
                after.to_rfc3339(),
                before.to_rfc3339()
            )));
        }
        Ok(Self { after, before })
    }

    /// Build a window from day offsets counted back from `now`
    ///
    /// `start_days` is the older edge, so it must be at least `end_days`.
    pub fn from_day_offsets(now: DateTime<Utc>, start_days: u32, end_days: u32) -> Result<Self> {
        if start_days < end_days {
            return Err(AdfCostError::InvalidDateWindow(format!(
                "start offset ({start_days} days) must not be more recent than end offset ({end_days} days)"
            )));
        }
        Self::new(
            now - Duration::days(i64::from(start_days)),
            now - Duration::days(i64::from(end_days)),
        )
    }

    /// Lower bound (`lastUpdatedAfter`)
    pub fn after(&self) -> DateTime<Utc> {
        self.after
    }

    /// Upper bound (`lastUpdatedBefore`)
    pub fn before(&self) -> DateTime<Utc> {
        self.before
    }
}

/// Bearer credential for the management API
///
/// The header value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    auth_header_value: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Create from a ready-made `Authorization` header value
    pub fn new(auth_header_value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            auth_header_value: auth_header_value.into(),
            expires_at,
        }
    }

    /// Create from a raw access token
    pub fn bearer(access_token: &str, expires_at: DateTime<Utc>) -> Self {
        Self::new(format!("Bearer {access_token}"), expires_at)
    }

    /// Value for the `Authorization` header
    pub fn auth_header_value(&self) -> &str {
        &self.auth_header_value
    }

    /// When the identity provider says the token stops working
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential stays valid for at least `margin` past `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - now >= margin
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("auth_header_value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One pipeline execution from `queryPipelineRuns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunRecord {
    pub run_id: String,
    pub pipeline_name: String,
    /// Null for runs still queued when the listing was taken
    #[serde(default)]
    pub run_start: Option<DateTime<Utc>>,
}

/// One activity execution from `queryActivityruns`
///
/// The API nests the billing fields inside a free-form `output` object that
/// is absent or shaped differently for activities that never ran, so the
/// wire form is parsed leniently. A `billingReference` that is present but
/// malformed fails the whole record, since dropping it would undercount usage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ActivityRunDto")]
pub struct ActivityRunRecord {
    pub effective_integration_runtime: String,
    pub billing_reference: Option<BillingReference>,
}

impl ActivityRunRecord {
    /// Integration runtime name the API reports for self-hosted runs
    pub const SELF_HOSTED_RUNTIME: &'static str = "SelfHostedRuntime";

    pub fn new(
        effective_integration_runtime: impl Into<String>,
        billing_reference: Option<BillingReference>,
    ) -> Self {
        Self {
            effective_integration_runtime: effective_integration_runtime.into(),
            billing_reference,
        }
    }

    /// Whether the activity ran on a self-hosted integration runtime
    pub fn is_self_hosted(&self) -> bool {
        self.effective_integration_runtime == Self::SELF_HOSTED_RUNTIME
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRunDto {
    #[serde(default)]
    activity_run_id: Option<String>,
    #[serde(default)]
    output: Option<serde_json::Value>,
}

impl TryFrom<ActivityRunDto> for ActivityRunRecord {
    type Error = String;

    fn try_from(dto: ActivityRunDto) -> std::result::Result<Self, Self::Error> {
        let output = dto.output.unwrap_or(serde_json::Value::Null);

        let effective_integration_runtime = output
            .get("effectiveIntegrationRuntime")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let billing_reference = match output.get("billingReference") {
            None | Some(serde_json::Value::Null) => None,
            Some(raw) => Some(
                serde_json::from_value::<BillingReference>(raw.clone()).map_err(|e| {
                    format!(
                        "invalid billingReference on activity run {}: {}",
                        dto.activity_run_id.as_deref().unwrap_or("<unknown>"),
                        e
                    )
                })?,
            ),
        };

        Ok(Self {
            effective_integration_runtime,
            billing_reference,
        })
    }
}

/// Billing-relevant part of an activity run's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingReference {
    pub activity_type: String,
    #[serde(default)]
    pub billable_duration: Vec<BillableDuration>,
}

/// A metered duration reported by one activity run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillableDuration {
    pub meter_type: String,
    pub duration: f64,
    #[serde(default)]
    pub unit: String,
}

/// Billing dimension of a billable duration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeterType {
    AzureIr,
    SelfHostedIr,
    GeneralPurpose,
    ComputeOptimized,
    MemoryOptimized,
    Other(String),
}

impl MeterType {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "azureir" => Self::AzureIr,
            "selfhostedir" => Self::SelfHostedIr,
            "generalpurpose" => Self::GeneralPurpose,
            "computedoptimized" | "computeoptimized" => Self::ComputeOptimized,
            "memoryoptimized" => Self::MemoryOptimized,
            _ => Self::Other(raw.to_string()),
        }
    }
}

/// Kind of work a billable duration was spent on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityType {
    DataMovement,
    PipelineActivity,
    ExternalActivity,
    ExecuteDataFlow,
    Other(String),
}

impl ActivityType {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "datamovement" => Self::DataMovement,
            "pipelineactivity" => Self::PipelineActivity,
            "externalactivity" => Self::ExternalActivity,
            "executedataflow" => Self::ExecuteDataFlow,
            _ => Self::Other(raw.to_string()),
        }
    }
}

/// A cost-bearing column of the report
///
/// The two `*ActivityRuns` categories are execution counts; the rest are
/// durations sourced from one (meter type, activity type) billing cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "AzureActivityRuns")]
    AzureActivityRuns,
    #[serde(rename = "SelfHostedActivityRuns")]
    SelfHostedActivityRuns,
    #[serde(rename = "AzureIRDataMovement_DIUHour")]
    AzureIrDataMovement,
    #[serde(rename = "AzureIRPipeline_Hour")]
    AzureIrPipeline,
    #[serde(rename = "AzureIRExternal_Hour")]
    AzureIrExternal,
    #[serde(rename = "SelfHostedDataMovement_Hour")]
    SelfHostedDataMovement,
    #[serde(rename = "SelfHostedPipeline_Hour")]
    SelfHostedPipeline,
    #[serde(rename = "SelfHostedExternal_Hour")]
    SelfHostedExternal,
    #[serde(rename = "ComputeGeneralPurpose_coreHour")]
    ComputeGeneralPurpose,
    #[serde(rename = "ComputeComputedOptimized_coreHour")]
    ComputeComputeOptimized,
    #[serde(rename = "ComputeMemoryOptimized_coreHour")]
    ComputeMemoryOptimized,
}

impl Category {
    /// All cost-bearing categories in report column order
    pub const ALL: [Category; 11] = [
        Category::AzureActivityRuns,
        Category::SelfHostedActivityRuns,
        Category::AzureIrDataMovement,
        Category::AzureIrPipeline,
        Category::AzureIrExternal,
        Category::SelfHostedDataMovement,
        Category::SelfHostedPipeline,
        Category::SelfHostedExternal,
        Category::ComputeGeneralPurpose,
        Category::ComputeComputeOptimized,
        Category::ComputeMemoryOptimized,
    ];

    /// Report column header
    pub fn column_name(self) -> &'static str {
        match self {
            Self::AzureActivityRuns => "AzureActivityRuns",
            Self::SelfHostedActivityRuns => "SelfHostedActivityRuns",
            Self::AzureIrDataMovement => "AzureIRDataMovement_DIUHour",
            Self::AzureIrPipeline => "AzureIRPipeline_Hour",
            Self::AzureIrExternal => "AzureIRExternal_Hour",
            Self::SelfHostedDataMovement => "SelfHostedDataMovement_Hour",
            Self::SelfHostedPipeline => "SelfHostedPipeline_Hour",
            Self::SelfHostedExternal => "SelfHostedExternal_Hour",
            Self::ComputeGeneralPurpose => "ComputeGeneralPurpose_coreHour",
            Self::ComputeComputeOptimized => "ComputeComputedOptimized_coreHour",
            Self::ComputeMemoryOptimized => "ComputeMemoryOptimized_coreHour",
        }
    }

    /// Whether the category counts executions rather than summing durations
    pub fn is_count(self) -> bool {
        matches!(self, Self::AzureActivityRuns | Self::SelfHostedActivityRuns)
    }

    /// Billing cell a duration category is sourced from
    pub fn billing_cell(self) -> Option<(MeterType, ActivityType)> {
        let cell = match self {
            Self::AzureActivityRuns | Self::SelfHostedActivityRuns => return None,
            Self::AzureIrDataMovement => (MeterType::AzureIr, ActivityType::DataMovement),
            Self::AzureIrPipeline => (MeterType::AzureIr, ActivityType::PipelineActivity),
            Self::AzureIrExternal => (MeterType::AzureIr, ActivityType::ExternalActivity),
            Self::SelfHostedDataMovement => (MeterType::SelfHostedIr, ActivityType::DataMovement),
            Self::SelfHostedPipeline => (MeterType::SelfHostedIr, ActivityType::PipelineActivity),
            Self::SelfHostedExternal => (MeterType::SelfHostedIr, ActivityType::ExternalActivity),
            Self::ComputeGeneralPurpose => (MeterType::GeneralPurpose, ActivityType::ExecuteDataFlow),
            Self::ComputeComputeOptimized => {
                (MeterType::ComputeOptimized, ActivityType::ExecuteDataFlow)
            }
            Self::ComputeMemoryOptimized => (MeterType::MemoryOptimized, ActivityType::ExecuteDataFlow),
        };
        Some(cell)
    }

    /// Duration category for a billing cell, if the cell is one the report prices
    pub fn from_cell(meter: &MeterType, activity: &ActivityType) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.billing_cell().is_some_and(|(m, a)| &m == meter && &a == activity))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

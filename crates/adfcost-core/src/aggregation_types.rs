//! Aggregation data types for adfcost
//!
//! Pure data structures for per-run usage, the region price table, and the
//! final report. These types have no dependencies on the HTTP client.

use crate::types::{Category, PipelineRunRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Label of the column-wise usage sum row
pub const TOTAL_USAGE_LABEL: &str = "Total Usage";
/// Label of the priced row
pub const CALCULATED_COSTS_LABEL: &str = "Calculated Costs";

/// Report column headers, in output order
pub const REPORT_COLUMNS: [&str; 16] = [
    "PipelineName",
    "RunId",
    "RunStart",
    "TotalActivityRuns",
    "AzureActivityRuns",
    "SelfHostedActivityRuns",
    "AzureIRDataMovement_DIUHour",
    "AzureIRPipeline_Hour",
    "AzureIRExternal_Hour",
    "SelfHostedDataMovement_Hour",
    "SelfHostedPipeline_Hour",
    "SelfHostedExternal_Hour",
    "ComputeGeneralPurpose_coreHour",
    "ComputeComputedOptimized_coreHour",
    "ComputeMemoryOptimized_coreHour",
    "Total Cost",
];

/// Usage of one pipeline run
///
/// Duration categories absent from `durations` were never observed in the
/// run; they are null, not zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub pipeline_name: String,
    pub run_id: String,
    pub run_start: Option<DateTime<Utc>>,
    pub total_activity_runs: u64,
    pub azure_activity_runs: u64,
    pub self_hosted_activity_runs: u64,
    pub durations: BTreeMap<Category, f64>,
}

impl UsageRecord {
    /// Empty usage for a run, before any activity is folded in
    pub fn for_run(run: &PipelineRunRecord) -> Self {
        Self {
            pipeline_name: run.pipeline_name.clone(),
            run_id: run.run_id.clone(),
            run_start: run.run_start,
            total_activity_runs: 0,
            azure_activity_runs: 0,
            self_hosted_activity_runs: 0,
            durations: BTreeMap::new(),
        }
    }

    /// Value of a cost-bearing column; `None` means not observed
    pub fn value(&self, category: Category) -> Option<f64> {
        match category {
            Category::AzureActivityRuns => Some(self.azure_activity_runs as f64),
            Category::SelfHostedActivityRuns => Some(self.self_hosted_activity_runs as f64),
            _ => self.durations.get(&category).copied(),
        }
    }
}

/// Column-wise sum over every run
///
/// Count columns are always present. A duration column is present only if
/// at least one run observed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub total_activity_runs: u64,
    pub values: BTreeMap<Category, f64>,
}

impl UsageTotals {
    pub fn from_records(records: &[UsageRecord]) -> Self {
        let mut totals = Self::default();
        for category in Category::ALL.into_iter().filter(|c| c.is_count()) {
            totals.values.insert(category, 0.0);
        }

        for record in records {
            totals.total_activity_runs += record.total_activity_runs;
            for category in Category::ALL {
                if let Some(value) = record.value(category) {
                    *totals.values.entry(category).or_insert(0.0) += value;
                }
            }
        }
        totals
    }

    pub fn value(&self, category: Category) -> Option<f64> {
        self.values.get(&category).copied()
    }
}

/// Unit prices for one pricing region
///
/// Every price is per report unit: per execution for the count categories,
/// per hour for the duration categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTable {
    pub region_slug: String,
    pub unit_prices: BTreeMap<Category, f64>,
}

impl PriceTable {
    pub fn price(&self, category: Category) -> Option<f64> {
        self.unit_prices.get(&category).copied()
    }
}

/// Priced usage totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostRow {
    pub costs: BTreeMap<Category, f64>,
    pub total_cost: f64,
}

impl CostRow {
    pub fn cost(&self, category: Category) -> Option<f64> {
        self.costs.get(&category).copied()
    }
}

/// Final report: per-run rows, then usage totals, then costs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub region_slug: String,
    pub runs: Vec<UsageRecord>,
    pub total_usage: UsageTotals,
    pub calculated_costs: CostRow,
}

/// One flattened report row aligned with [`REPORT_COLUMNS`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub pipeline_name: String,
    pub run_id: String,
    pub run_start: Option<DateTime<Utc>>,
    /// Numeric cells for every column after `RunStart`
    pub cells: Vec<Option<f64>>,
}

impl Report {
    /// All rows in output order: runs, then "Total Usage", then "Calculated Costs"
    pub fn rows(&self) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = self
            .runs
            .iter()
            .map(|run| {
                let mut cells = Vec::with_capacity(REPORT_COLUMNS.len() - 3);
                cells.push(Some(run.total_activity_runs as f64));
                cells.extend(Category::ALL.into_iter().map(|c| run.value(c)));
                cells.push(None);
                ReportRow {
                    pipeline_name: run.pipeline_name.clone(),
                    run_id: run.run_id.clone(),
                    run_start: run.run_start,
                    cells,
                }
            })
            .collect();

        let mut usage_cells = vec![Some(self.total_usage.total_activity_runs as f64)];
        usage_cells.extend(Category::ALL.into_iter().map(|c| self.total_usage.value(c)));
        usage_cells.push(None);
        rows.push(ReportRow {
            pipeline_name: TOTAL_USAGE_LABEL.to_string(),
            run_id: String::new(),
            run_start: None,
            cells: usage_cells,
        });

        let mut cost_cells = vec![None];
        cost_cells.extend(Category::ALL.into_iter().map(|c| self.calculated_costs.cost(c)));
        cost_cells.push(Some(self.calculated_costs.total_cost));
        rows.push(ReportRow {
            pipeline_name: CALCULATED_COSTS_LABEL.to_string(),
            run_id: String::new(),
            run_start: None,
            cells: cost_cells,
        });

        rows
    }
}

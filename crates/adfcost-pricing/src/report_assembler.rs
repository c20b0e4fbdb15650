//! Report assembly
//!
//! Combines per-run usage with a region price table into the final
//! [`Report`]: the run rows in traversal order, a "Total Usage" row holding
//! column sums, and a "Calculated Costs" row pricing those sums.
//!
//! # Examples
//!
//! ```
//! use adfcost_core::aggregation_types::{PriceTable, UsageRecord};
//! use adfcost_core::types::{Category, PipelineRunRecord};
//! use adfcost_pricing::ReportAssembler;
//! use std::collections::BTreeMap;
//!
//! let run = PipelineRunRecord {
//!     run_id: "r1".to_string(),
//!     pipeline_name: "copy".to_string(),
//!     run_start: None,
//! };
//! let mut usage = UsageRecord::for_run(&run);
//! usage.total_activity_runs = 1000;
//! usage.azure_activity_runs = 1000;
//!
//! let prices = PriceTable {
//!     region_slug: "us-east".to_string(),
//!     unit_prices: BTreeMap::from([(Category::AzureActivityRuns, 0.0005)]),
//! };
//!
//! let report = ReportAssembler::assemble(vec![usage], &prices);
//! assert!((report.calculated_costs.total_cost - 0.5).abs() < 1e-9);
//! ```

use adfcost_core::aggregation_types::{CostRow, PriceTable, Report, UsageRecord, UsageTotals};
use adfcost_core::types::Category;
use tracing::{debug, warn};

/// Builds reports from usage and prices
pub struct ReportAssembler;

impl ReportAssembler {
    /// Assemble the full report
    ///
    /// # Arguments
    ///
    /// * `records` - Per-run usage, in the order runs were discovered
    /// * `prices` - Unit prices for the factory's region
    pub fn assemble(records: Vec<UsageRecord>, prices: &PriceTable) -> Report {
        let total_usage = UsageTotals::from_records(&records);
        let calculated_costs = Self::price_totals(&total_usage, prices);
        debug!(
            "Assembled report of {} runs, total cost {:.6}",
            records.len(),
            calculated_costs.total_cost
        );

        Report {
            region_slug: prices.region_slug.clone(),
            runs: records,
            total_usage,
            calculated_costs,
        }
    }

    /// Price column totals
    ///
    /// A category without usage has no cost cell. Total Cost sums the cells
    /// that are present.
    pub fn price_totals(totals: &UsageTotals, prices: &PriceTable) -> CostRow {
        let mut row = CostRow::default();

        for category in Category::ALL {
            let Some(usage) = totals.value(category) else {
                continue;
            };
            let Some(unit_price) = prices.price(category) else {
                warn!("No unit price for {}, leaving its cost empty", category);
                continue;
            };

            let cost = Self::calculate_cost(usage, unit_price);
            row.costs.insert(category, cost);
            row.total_cost += cost;
        }

        row
    }

    /// Cost of `usage` units at `unit_price`, never negative
    pub fn calculate_cost(usage: f64, unit_price: f64) -> f64 {
        (usage * unit_price).max(0.0)
    }
}

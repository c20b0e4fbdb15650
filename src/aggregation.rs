//! Usage aggregation module
//!
//! This module folds the activity runs of one pipeline run into a
//! [`UsageRecord`]: activity-run counts split by integration runtime, and the
//! summed billable durations of the nine priced (meter type, activity type)
//! cells.
//!
//! Durations are normalized to hours before summing. A cell that never
//! appears in the run stays absent from the record, so the report shows it
//! as empty rather than zero.
//!
//! # Examples
//!
//! ```
//! use adfcost::aggregation::UsageAggregator;
//! use adfcost_core::types::{
//!     ActivityRunRecord, BillableDuration, BillingReference, Category, PipelineRunRecord,
//! };
//!
//! let run = PipelineRunRecord {
//!     run_id: "r1".to_string(),
//!     pipeline_name: "copy-sales".to_string(),
//!     run_start: None,
//! };
//! let copy = |hours: f64| {
//!     ActivityRunRecord::new(
//!         "AutoResolveIntegrationRuntime",
//!         Some(BillingReference {
//!             activity_type: "DataMovement".to_string(),
//!             billable_duration: vec![BillableDuration {
//!                 meter_type: "AzureIR".to_string(),
//!                 duration: hours,
//!                 unit: "DIUHours".to_string(),
//!             }],
//!         }),
//!     )
//! };
//!
//! let usage = UsageAggregator::aggregate(&run, &[copy(2.5), copy(3.5)]);
//! assert_eq!(usage.value(Category::AzureIrDataMovement), Some(6.0));
//! assert_eq!(usage.value(Category::SelfHostedPipeline), None);
//! ```

use adfcost_core::aggregation_types::UsageRecord;
use adfcost_core::types::{ActivityRunRecord, ActivityType, Category, MeterType, PipelineRunRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Running sum of one billing cell
#[derive(Debug, Default)]
struct CellAccumulator {
    hours: f64,
    units: BTreeSet<String>,
}

impl CellAccumulator {
    fn add(&mut self, duration: f64, unit: &str) {
        self.hours += UsageAggregator::normalize_to_hours(duration, unit);
        self.units.insert(unit.to_string());
    }
}

/// Folds activity runs into per-run usage
pub struct UsageAggregator;

impl UsageAggregator {
    /// Aggregate the activity runs of `run`
    ///
    /// # Arguments
    ///
    /// * `run` - The pipeline run the activities belong to
    /// * `activities` - Every activity run of that pipeline run
    pub fn aggregate(run: &PipelineRunRecord, activities: &[ActivityRunRecord]) -> UsageRecord {
        let mut usage = UsageRecord::for_run(run);
        let mut cells: BTreeMap<Category, CellAccumulator> = BTreeMap::new();

        for activity in activities {
            usage.total_activity_runs += 1;
            if activity.is_self_hosted() {
                usage.self_hosted_activity_runs += 1;
            } else {
                usage.azure_activity_runs += 1;
            }

            let Some(billing) = &activity.billing_reference else {
                continue;
            };
            let activity_type = ActivityType::parse(&billing.activity_type);

            for billed in &billing.billable_duration {
                let meter_type = MeterType::parse(&billed.meter_type);
                match Category::from_cell(&meter_type, &activity_type) {
                    Some(category) => cells
                        .entry(category)
                        .or_default()
                        .add(billed.duration, &billed.unit),
                    None => warn!(
                        "Run {}: ignoring unpriced billing cell {} / {} ({} {})",
                        run.run_id,
                        billed.meter_type,
                        billing.activity_type,
                        billed.duration,
                        billed.unit
                    ),
                }
            }
        }

        for (category, cell) in cells {
            if cell.units.len() > 1 {
                warn!(
                    "Run {}: {} mixes units {:?}",
                    run.run_id, category, cell.units
                );
            }
            usage.durations.insert(category, cell.hours);
        }

        debug!(
            "Run {} ({}): {} activity runs, {} observed duration columns",
            usage.run_id,
            usage.pipeline_name,
            usage.total_activity_runs,
            usage.durations.len()
        );
        usage
    }

    /// Convert a billable duration to hours
    ///
    /// Units naming hours (`Hours`, `DIUHours`, `coreHour`) pass through.
    /// An empty unit is taken as hours, which is what the service reports.
    pub fn normalize_to_hours(duration: f64, unit: &str) -> f64 {
        let unit = unit.to_ascii_lowercase();
        if unit.is_empty() || unit.contains("hour") {
            duration
        } else if unit.contains("minute") {
            duration / 60.0
        } else if unit.contains("second") {
            duration / 3600.0
        } else {
            warn!("Unrecognized duration unit '{}', summing as-is", unit);
            duration
        }
    }
}

//! Core types and error handling for adfcost
//!
//! This crate provides the foundational types (query window, credential,
//! run records, billing categories, usage/price/report structures) and the
//! error taxonomy used by all other adfcost crates.

pub mod aggregation_types;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use aggregation_types::{
    CostRow, PriceTable, REPORT_COLUMNS, Report, ReportRow, UsageRecord, UsageTotals,
};
pub use error::{AdfCostError, PriceResolutionError, Result};
pub use types::{
    ActivityRunRecord, BillableDuration, BillingReference, Category, Credential, DateWindow,
    PipelineRunRecord,
};

//! adfcost - Azure Data Factory consumption and cost estimation
//!
//! This library provides functionality to:
//! - Fold every activity run of a pipeline run into per-category usage
//! - Orchestrate a full job: price resolution, run traversal, report assembly
//! - Render the report as a table, JSON, or CSV
//!
//! The network-facing pieces live in `adfcost-client`, the domain types in
//! `adfcost-core`, and catalog pricing in `adfcost-pricing`.
//!
//! # Examples
//!
//! ```no_run
//! use adfcost::job::{JobConfig, UsageJob};
//! use adfcost_client::{CredentialManager, FactoryScope, ReqwestTransport, RetryPolicy};
//! use adfcost_client::token_source::AzureCliTokenSource;
//! use adfcost_core::types::DateWindow;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> adfcost::Result<()> {
//!     let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(60), RetryPolicy::default())?);
//!     let credentials = Arc::new(CredentialManager::new(Arc::new(AzureCliTokenSource::new("sub"))));
//!
//!     let config = JobConfig {
//!         scope: FactoryScope::new("sub", "rg", "adf-prod"),
//!         window: DateWindow::from_day_offsets(chrono::Utc::now(), 30, 0)?,
//!         region: None,
//!         concurrency: 4,
//!     };
//!     let report = UsageJob::new(transport, credentials, config).run().await?;
//!     println!("Total cost: {:.2}", report.calculated_costs.total_cost);
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod job;
pub mod output;

// Re-export commonly used types
pub use adfcost_core::error::{AdfCostError, Result};
pub use aggregation::UsageAggregator;
pub use job::{JobConfig, UsageJob};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Consumption job orchestration
//!
//! A job prices the factory's region first, so a catalog or region problem
//! fails before the long traversal starts. It then streams every pipeline
//! run with its activities, folding each into a [`UsageRecord`] as it
//! arrives, and assembles the report.

use crate::aggregation::UsageAggregator;
use adfcost_client::credential::CredentialManager;
use adfcost_client::endpoints::{FactoryScope, fetch_factory_location};
use adfcost_client::pager::PagedCollectionFetcher;
use adfcost_client::transport::Transport;
use adfcost_client::traversal::RunTraversal;
use adfcost_core::aggregation_types::{PriceTable, Report, UsageRecord};
use adfcost_core::error::Result;
use adfcost_core::types::DateWindow;
use adfcost_pricing::{PriceResolver, ReportAssembler};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::pin::pin;
use std::sync::Arc;
use tracing::info;

/// What to report on
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub scope: FactoryScope,
    pub window: DateWindow,
    /// Priced region; the factory's location when `None`
    pub region: Option<String>,
    pub concurrency: usize,
}

/// One end-to-end consumption report
pub struct UsageJob {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialManager>,
    resolver: PriceResolver,
    config: JobConfig,
    show_progress: bool,
}

impl UsageJob {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialManager>,
        config: JobConfig,
    ) -> Self {
        let resolver = PriceResolver::new(Arc::clone(&transport));
        Self {
            transport,
            credentials,
            resolver,
            config,
            show_progress: false,
        }
    }

    /// Replace the default live-catalog resolver
    pub fn with_price_resolver(mut self, resolver: PriceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Enable or disable the progress spinner
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the whole job
    pub async fn run(&self) -> Result<Report> {
        info!(
            "Reporting on factory {} from {} to {}",
            self.config.scope.factory_name,
            self.config.window.after().to_rfc3339(),
            self.config.window.before().to_rfc3339()
        );

        let prices = self.resolve_prices().await?;
        let usage = self.collect_usage().await?;
        Ok(ReportAssembler::assemble(usage, &prices))
    }

    /// Price table for the configured or discovered region
    pub async fn resolve_prices(&self) -> Result<PriceTable> {
        let region = match &self.config.region {
            Some(region) => region.clone(),
            None => {
                fetch_factory_location(
                    self.transport.as_ref(),
                    &self.credentials,
                    &self.config.scope,
                )
                .await?
            }
        };
        self.resolver.resolve(&region).await
    }

    /// Per-run usage in discovery order
    pub async fn collect_usage(&self) -> Result<Vec<UsageRecord>> {
        let traversal = RunTraversal::new(
            PagedCollectionFetcher::new(Arc::clone(&self.transport), Arc::clone(&self.credentials)),
            self.config.scope.clone(),
        )
        .with_concurrency(self.config.concurrency);

        let progress = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}] {pos} runs processed")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Fetching activity runs");
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let mut records = Vec::new();
        let mut runs = pin!(traversal.stream_runs(&self.config.window));
        while let Some(item) = runs.next().await {
            let (run, activities) = match item {
                Ok(item) => item,
                Err(e) => {
                    if let Some(pb) = &progress {
                        pb.abandon_with_message("Traversal failed");
                    }
                    return Err(e);
                }
            };
            records.push(UsageAggregator::aggregate(&run, &activities));

            if let Some(pb) = &progress {
                pb.set_position(records.len() as u64);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Aggregated {} pipeline runs", records.len()));
        }
        info!(
            "Aggregated {} pipeline runs ({} credential handshakes)",
            records.len(),
            self.credentials.handshakes()
        );
        Ok(records)
    }
}

//! Pipeline-run / activity-run traversal
//!
//! Lists every pipeline run in the window, then every activity run of each
//! pipeline run, in discovery order. With `concurrency > 1` several runs'
//! activity listings are in flight at once; results are still yielded in
//! discovery order, and credential refresh stays serialized inside the
//! shared [`crate::credential::CredentialManager`].

use crate::endpoints::{FactoryScope, window_filter};
use crate::pager::PagedCollectionFetcher;
use adfcost_core::error::Result;
use adfcost_core::types::{ActivityRunRecord, DateWindow, PipelineRunRecord};
use async_stream::try_stream;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::pin::pin;
use tracing::{debug, info};

/// A pipeline run with all of its activity runs
pub type RunWithActivities = (PipelineRunRecord, Vec<ActivityRunRecord>);

/// Walks a factory's runs
pub struct RunTraversal {
    fetcher: PagedCollectionFetcher,
    scope: FactoryScope,
    concurrency: usize,
}

impl RunTraversal {
    pub fn new(fetcher: PagedCollectionFetcher, scope: FactoryScope) -> Self {
        Self {
            fetcher,
            scope,
            concurrency: 1,
        }
    }

    /// Fetch up to `concurrency` runs' activities at once (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Every pipeline run updated inside the window
    pub async fn list_pipeline_runs(&self, window: &DateWindow) -> Result<Vec<PipelineRunRecord>> {
        let paged = self
            .fetcher
            .fetch_all::<PipelineRunRecord>(&self.scope.pipeline_runs_url(), &window_filter(window))
            .await?;
        info!(
            "Found {} pipeline runs in {} page(s)",
            paged.records.len(),
            paged.pages
        );
        Ok(paged.records)
    }

    /// Every activity run of one pipeline run
    pub async fn list_activity_runs(
        &self,
        window: &DateWindow,
        run: &PipelineRunRecord,
    ) -> Result<Vec<ActivityRunRecord>> {
        let paged = self
            .fetcher
            .fetch_all::<ActivityRunRecord>(
                &self.scope.activity_runs_url(&run.run_id),
                &window_filter(window),
            )
            .await?;
        debug!(
            "Run {} ({}): {} activity runs",
            run.run_id,
            run.pipeline_name,
            paged.records.len()
        );
        Ok(paged.records)
    }

    async fn with_activities(
        &self,
        window: &DateWindow,
        run: PipelineRunRecord,
    ) -> Result<RunWithActivities> {
        let activities = self.list_activity_runs(window, &run).await?;
        Ok((run, activities))
    }

    /// Activity listings for already-discovered runs, in the order given
    pub fn stream_activities<'a>(
        &'a self,
        window: &'a DateWindow,
        runs: Vec<PipelineRunRecord>,
    ) -> impl Stream<Item = Result<RunWithActivities>> + 'a {
        stream::iter(runs)
            .map(move |run| self.with_activities(window, run))
            .buffered(self.concurrency)
    }

    /// Discover runs, then stream each with its activities
    pub fn stream_runs<'a>(
        &'a self,
        window: &'a DateWindow,
    ) -> impl Stream<Item = Result<RunWithActivities>> + 'a {
        try_stream! {
            let runs = self.list_pipeline_runs(window).await?;
            let mut activities = pin!(self.stream_activities(window, runs));
            while let Some(item) = activities.next().await {
                yield item?;
            }
        }
    }

    /// Collect the full traversal into memory
    pub async fn traverse(&self, window: &DateWindow) -> Result<Vec<RunWithActivities>> {
        self.stream_runs(window).try_collect().await
    }
}

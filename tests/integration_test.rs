//! Integration tests across the client, pricing and aggregation layers

mod common;

use adfcost::aggregation::UsageAggregator;
use adfcost_client::endpoints::window_filter;
use adfcost_client::pager::PagedCollectionFetcher;
use adfcost_client::traversal::RunTraversal;
use adfcost_core::aggregation_types::UsageRecord;
use adfcost_core::error::AdfCostError;
use adfcost_core::types::{ActivityRunRecord, Category, PipelineRunRecord};
use adfcost_pricing::{PriceResolver, PricingCatalog, ReportAssembler};
use common::*;
use serde_json::json;
use std::sync::Arc;

fn fetcher(transport: Arc<ScriptedTransport>) -> PagedCollectionFetcher {
    PagedCollectionFetcher::new(transport, credentials())
}

#[tokio::test]
async fn test_pagination_issues_one_request_per_page() {
    let scope = test_scope();
    let transport = Arc::new(ScriptedTransport::new());
    let pages = 5;
    for page in 0..pages {
        let token = if page + 1 < pages {
            json!(format!("token-{page}"))
        } else {
            json!(null)
        };
        transport.push(
            &scope.pipeline_runs_url(),
            Reply::Json(json!({
                "value": [run_json(&format!("run-{page}-a"), "p"), run_json(&format!("run-{page}-b"), "p")],
                "continuationToken": token
            })),
        );
    }

    let paged = fetcher(transport.clone())
        .fetch_all::<PipelineRunRecord>(&scope.pipeline_runs_url(), &window_filter(&test_window()))
        .await
        .unwrap();

    assert_eq!(paged.pages, pages);
    assert_eq!(transport.seen().len(), pages);
    assert_eq!(paged.records.len(), 2 * pages);
    assert_eq!(paged.records[0].run_id, "run-0-a");
    assert_eq!(paged.records[9].run_id, "run-4-b");
}

#[tokio::test]
async fn test_traversal_feeds_aggregator() {
    let transport = Arc::new(ScriptedTransport::new());
    script_standard_factory(&transport, 3);

    let traversal = RunTraversal::new(fetcher(transport), test_scope());
    let runs = traversal.traverse(&test_window()).await.unwrap();
    let usage: Vec<UsageRecord> = runs
        .iter()
        .map(|(run, activities)| UsageAggregator::aggregate(run, activities))
        .collect();

    assert_eq!(usage.len(), 3);
    for record in &usage {
        assert_eq!(record.total_activity_runs, 3);
        assert_eq!(record.azure_activity_runs, 2);
        assert_eq!(record.self_hosted_activity_runs, 1);
        assert_eq!(record.value(Category::AzureIrDataMovement), Some(3.0));
        assert_eq!(record.value(Category::SelfHostedPipeline), Some(0.25));
        assert_eq!(record.value(Category::AzureIrExternal), None);
    }
}

#[tokio::test]
async fn test_activity_without_billing_reference() {
    let scope = test_scope();
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(
        &scope.pipeline_runs_url(),
        Reply::Json(json!({ "value": [run_json("run-q", "queued")] })),
    );
    transport.push(
        &scope.activity_runs_url("run-q"),
        Reply::Json(json!({
            "value": [
                { "activityRunId": "a1", "status": "Failed", "output": null },
                { "activityRunId": "a2", "status": "Cancelled" },
                { "activityRunId": "a3", "output": { "effectiveIntegrationRuntime": "SelfHostedRuntime", "billingReference": null } }
            ]
        })),
    );

    let runs = RunTraversal::new(fetcher(transport), scope)
        .traverse(&test_window())
        .await
        .unwrap();
    let usage = UsageAggregator::aggregate(&runs[0].0, &runs[0].1);

    assert_eq!(usage.total_activity_runs, 3);
    assert_eq!(usage.self_hosted_activity_runs, 1);
    assert_eq!(usage.azure_activity_runs, 2);
    assert!(usage.durations.is_empty());
}

#[tokio::test]
async fn test_malformed_billing_reference_aborts_traversal() {
    let scope = test_scope();
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(
        &scope.pipeline_runs_url(),
        Reply::Json(json!({ "value": [run_json("run-m", "copy")] })),
    );
    transport.push(
        &scope.activity_runs_url("run-m"),
        Reply::Json(json!({
            "value": [{
                "activityRunId": "a1",
                "output": {
                    "effectiveIntegrationRuntime": "AutoResolveIntegrationRuntime",
                    "billingReference": {
                        "activityType": "DataMovement",
                        "billableDuration": [
                            { "meterType": "AzureIR", "duration": 4.0, "unit": "DIUHours" },
                            { "meterType": "AzureIR", "duration": null, "unit": "DIUHours" }
                        ]
                    }
                }
            }]
        })),
    );

    let err = RunTraversal::new(fetcher(transport), scope)
        .traverse(&test_window())
        .await
        .unwrap_err();

    match err {
        AdfCostError::Pagination { page, source, .. } => {
            assert_eq!(page, 1);
            assert!(matches!(*source, AdfCostError::Json(_)));
        }
        other => panic!("expected pagination error, got {other:?}"),
    }
}

#[test]
fn test_missing_self_hosted_columns_total_from_observed_runs() {
    let run = |id: &str| PipelineRunRecord {
        run_id: id.to_string(),
        pipeline_name: "p".to_string(),
        run_start: None,
    };
    let azure_only: Vec<ActivityRunRecord> =
        serde_json::from_value(json!([
            ActivityBuilder::azure("PipelineActivity").duration("AzureIR", 0.5, "Hours").build()
        ]))
        .unwrap();
    let self_hosted: Vec<ActivityRunRecord> =
        serde_json::from_value(json!([
            ActivityBuilder::self_hosted("DataMovement").duration("SelfHostedIR", 2.0, "Hours").build()
        ]))
        .unwrap();

    let records = vec![
        UsageAggregator::aggregate(&run("r1"), &azure_only),
        UsageAggregator::aggregate(&run("r2"), &self_hosted),
    ];
    assert_eq!(records[0].value(Category::SelfHostedDataMovement), None);

    let catalog: PricingCatalog =
        serde_json::from_value(catalog_json("East US", "us-east", 1.0)).unwrap();
    let prices = catalog.resolve("EastUS").unwrap();
    let report = ReportAssembler::assemble(records, &prices);

    assert_eq!(report.total_usage.value(Category::SelfHostedDataMovement), Some(2.0));
    assert_eq!(report.total_usage.value(Category::AzureIrPipeline), Some(0.5));
    assert_eq!(report.total_usage.value(Category::SelfHostedPipeline), None);
    assert_eq!(report.calculated_costs.cost(Category::SelfHostedPipeline), None);
}

#[tokio::test]
async fn test_price_resolver_against_scripted_catalog() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(CATALOG_URL, Reply::Json(catalog_json("East US", "us-east", 0.5)));

    let prices = PriceResolver::new(transport)
        .with_catalog_url(CATALOG_URL)
        .resolve("EastUS")
        .await
        .unwrap();

    assert_eq!(prices.region_slug, "us-east");
    let per_run = prices.price(Category::AzureActivityRuns).unwrap();
    assert!((per_run - 0.0005).abs() < 1e-12);
    assert_eq!(prices.price(Category::ComputeMemoryOptimized), Some(0.5));
}

#[tokio::test]
async fn test_catalog_fetch_failure_surfaces_http_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(CATALOG_URL, Reply::Status(503));

    let err = PriceResolver::new(transport)
        .with_catalog_url(CATALOG_URL)
        .resolve("EastUS")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

//! adfcost - Estimate Azure Data Factory consumption and cost for a date window

use adfcost::{
    cli::Cli,
    job::{JobConfig, UsageJob},
    output::{get_formatter, write_csv},
};
use adfcost_client::credential::CredentialManager;
use adfcost_client::transport::{ReqwestTransport, Transport};
use adfcost_core::error::Result;
use adfcost_pricing::{PriceResolver, PricingCatalog};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The --quiet flag overrides RUST_LOG
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("adfcost=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli.validate()?;
    let window = cli.date_window(Utc::now())?;

    let http = ReqwestTransport::new(cli.timeout(), cli.retry_policy())?;
    let credentials = Arc::new(CredentialManager::new(cli.token_source(&http)?));
    let transport: Arc<dyn Transport> = Arc::new(http);

    let mut resolver = PriceResolver::new(Arc::clone(&transport));
    if let Some(path) = &cli.pricing_file {
        info!("Using pricing snapshot {}", path.display());
        resolver = resolver.with_catalog(PricingCatalog::load(path).await?);
    }

    let show_progress = !cli.json && !cli.quiet && is_terminal::is_terminal(std::io::stderr());
    let config = JobConfig {
        scope: cli.factory_scope(),
        window,
        region: cli.region.clone(),
        concurrency: cli.concurrency,
    };
    let report = UsageJob::new(transport, credentials, config)
        .with_price_resolver(resolver)
        .with_progress(show_progress)
        .run()
        .await?;

    if let Some(path) = &cli.output {
        write_csv(&report, path)?;
    }

    println!("{}", get_formatter(cli.json).format_report(&report));

    if !cli.json {
        let summary = format!(
            "Estimated cost of {} pipeline runs: ${:.2}",
            report.runs.len(),
            report.calculated_costs.total_cost
        );
        println!("{}", summary.bold().green());
    }

    Ok(())
}

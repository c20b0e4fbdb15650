//! CLI interface for adfcost
//!
//! Every option can come from a flag or from an environment variable, so the
//! tool runs the same way interactively and from a scheduled pipeline.
//!
//! # Example
//!
//! ```bash
//! # Last 30 days of usage, printed as a table and saved to CSV
//! adfcost --subscription-id 0000-... --resource-group data --factory-name adf-prod \
//!     --output usage.csv
//!
//! # A fixed window from 60 to 30 days ago, as JSON, with a service principal
//! adfcost --start-days 60 --end-days 30 --json --auth client-secret
//! ```

use adfcost_client::credential::TokenSource;
use adfcost_client::endpoints::FactoryScope;
use adfcost_client::token_source::{AzureCliTokenSource, ClientSecretTokenSource, StaticTokenSource};
use adfcost_client::transport::{ReqwestTransport, RetryPolicy};
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::DateWindow;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Estimate Azure Data Factory consumption and cost for a date window
#[derive(Parser, Debug, Clone)]
#[command(name = "adfcost")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Azure subscription that owns the factory
    #[arg(long, env = "ADFCOST_SUBSCRIPTION_ID")]
    pub subscription_id: String,

    /// Resource group of the factory
    #[arg(long, env = "ADFCOST_RESOURCE_GROUP")]
    pub resource_group: String,

    /// Data factory name
    #[arg(long, env = "ADFCOST_FACTORY_NAME")]
    pub factory_name: String,

    /// Window start, in days before now
    #[arg(long, env = "ADFCOST_START_DAYS", default_value_t = 30)]
    pub start_days: u32,

    /// Window end, in days before now
    #[arg(long, env = "ADFCOST_END_DAYS", default_value_t = 0)]
    pub end_days: u32,

    /// Write the report as CSV to this path
    #[arg(long, short = 'o', env = "ADFCOST_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Where bearer tokens come from
    #[arg(long, value_enum, env = "ADFCOST_AUTH", default_value = "azure-cli")]
    pub auth: AuthMethod,

    /// Directory (tenant) id for --auth client-secret
    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Application (client) id for --auth client-secret
    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret for --auth client-secret
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Bearer token for --auth static
    #[arg(long, env = "ADFCOST_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Price this region instead of the factory's location (e.g. "EastUS")
    #[arg(long, env = "ADFCOST_REGION")]
    pub region: Option<String>,

    /// Price from a saved catalog snapshot instead of the live catalog
    #[arg(long, env = "ADFCOST_PRICING_FILE")]
    pub pricing_file: Option<PathBuf>,

    /// Pipeline runs whose activities are fetched in parallel
    #[arg(long, env = "ADFCOST_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Retries for transient network and server failures
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Only show warnings and errors
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Token source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMethod {
    /// `az account get-access-token`
    AzureCli,
    /// OAuth2 client credentials of a service principal
    ClientSecret,
    /// A bearer token supplied with --access-token
    Static,
}

impl Cli {
    /// Check option combinations clap cannot express
    pub fn validate(&self) -> Result<()> {
        if self.start_days < self.end_days {
            return Err(AdfCostError::InvalidDateWindow(format!(
                "--start-days ({}) must not be smaller than --end-days ({})",
                self.start_days, self.end_days
            )));
        }
        if self.concurrency == 0 {
            return Err(AdfCostError::InvalidArgument(
                "--concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AdfCostError::InvalidArgument(
                "--timeout-secs must be at least 1".to_string(),
            ));
        }

        match self.auth {
            AuthMethod::AzureCli => {}
            AuthMethod::ClientSecret => {
                let missing: Vec<&str> = [
                    ("--tenant-id", &self.tenant_id),
                    ("--client-id", &self.client_id),
                    ("--client-secret", &self.client_secret),
                ]
                .into_iter()
                .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
                .map(|(flag, _)| flag)
                .collect();
                if !missing.is_empty() {
                    return Err(AdfCostError::InvalidArgument(format!(
                        "--auth client-secret requires {}",
                        missing.join(", ")
                    )));
                }
            }
            AuthMethod::Static => {
                if self.access_token.as_deref().is_none_or(str::is_empty) {
                    return Err(AdfCostError::InvalidArgument(
                        "--auth static requires --access-token".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// The query window relative to `now`
    pub fn date_window(&self, now: DateTime<Utc>) -> Result<DateWindow> {
        DateWindow::from_day_offsets(now, self.start_days, self.end_days)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn factory_scope(&self) -> FactoryScope {
        FactoryScope::new(
            self.subscription_id.clone(),
            self.resource_group.clone(),
            self.factory_name.clone(),
        )
    }

    /// Build the selected token source
    ///
    /// The client-secret flow shares the transport's HTTP client so it gets
    /// the same timeout.
    pub fn token_source(&self, transport: &ReqwestTransport) -> Result<Arc<dyn TokenSource>> {
        let source: Arc<dyn TokenSource> = match self.auth {
            AuthMethod::AzureCli => Arc::new(AzureCliTokenSource::new(self.subscription_id.clone())),
            AuthMethod::ClientSecret => {
                let (Some(tenant), Some(client_id), Some(secret)) =
                    (&self.tenant_id, &self.client_id, &self.client_secret)
                else {
                    return Err(AdfCostError::InvalidArgument(
                        "--auth client-secret requires --tenant-id, --client-id and --client-secret"
                            .to_string(),
                    ));
                };
                Arc::new(ClientSecretTokenSource::new(
                    transport.client().clone(),
                    tenant.clone(),
                    client_id.clone(),
                    secret.clone(),
                ))
            }
            AuthMethod::Static => {
                let token = self.access_token.as_deref().ok_or_else(|| {
                    AdfCostError::InvalidArgument("--auth static requires --access-token".to_string())
                })?;
                Arc::new(StaticTokenSource::valid_for_an_hour(token))
            }
        };
        Ok(source)
    }
}

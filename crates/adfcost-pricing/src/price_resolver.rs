//! Price resolver for the public Data Factory rate catalog
//!
//! The catalog lists regions as `{DisplayName, slug}` pairs and prices as
//! `offers.<offer key>.prices.<slug>.value`. Resolution maps the factory's
//! location (a display name without spaces, e.g. `EastUS`) to a slug and
//! reads one unit price per [`Category`].

use adfcost_client::transport::Transport;
use adfcost_core::aggregation_types::PriceTable;
use adfcost_core::error::{PriceResolutionError, Result};
use adfcost_core::types::Category;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Public Data Factory pricing catalog
pub const PRICING_CATALOG_URL: &str =
    "https://azure.microsoft.com/api/v3/pricing/data-factory/calculator/";

/// Slug the catalog uses for prices that do not vary by region
const GLOBAL_SLUG: &str = "global";

/// Catalog offer priced for each category
const OFFER_KEYS: [(Category, &str); 11] = [
    (Category::AzureActivityRuns, "data-pipeline-orchestration-azure-ir"),
    (Category::SelfHostedActivityRuns, "data-pipeline-orchestration-self-hosted-ir"),
    (Category::AzureIrDataMovement, "data-pipeline-data-movement-azure-ir"),
    (Category::AzureIrPipeline, "data-pipeline-pipeline-activity-azure-ir"),
    (Category::AzureIrExternal, "data-pipeline-external-activity-azure-ir"),
    (Category::SelfHostedDataMovement, "data-pipeline-data-movement-self-hosted-ir"),
    (Category::SelfHostedPipeline, "data-pipeline-pipeline-activity-self-hosted-ir"),
    (Category::SelfHostedExternal, "data-pipeline-external-activity-self-hosted-ir"),
    (Category::ComputeGeneralPurpose, "data-flow-general-purpose"),
    (Category::ComputeComputeOptimized, "data-flow-compute-optimized"),
    (Category::ComputeMemoryOptimized, "data-flow-memory-optimized"),
];

/// Orchestration is quoted per 1000 activity runs
const PER_THOUSAND: f64 = 0.001;

/// Offer key the catalog prices `category` under
pub fn offer_key(category: Category) -> &'static str {
    OFFER_KEYS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, key)| *key)
        .unwrap_or_default()
}

/// Factor turning a catalog price into a per-report-unit price
pub fn catalog_scale(category: Category) -> f64 {
    if category.is_count() { PER_THOUSAND } else { 1.0 }
}

/// The rate catalog document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingCatalog {
    #[serde(default)]
    pub regions: Vec<CatalogRegion>,
    #[serde(default)]
    pub offers: HashMap<String, CatalogOffer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRegion {
    #[serde(rename = "DisplayName", alias = "displayName")]
    pub display_name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogOffer {
    #[serde(default)]
    pub prices: HashMap<String, CatalogPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPrice {
    pub value: f64,
}

impl PricingCatalog {
    /// Parse a catalog snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a catalog snapshot saved to disk
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Slug of the region whose display name, spaces removed, equals `location`
    ///
    /// Comparison ignores ASCII case since the management API reports
    /// locations in lowercase (`eastus`) in some responses.
    pub fn find_region_slug(&self, location: &str) -> Option<&str> {
        let wanted = normalize_region(location);
        self.regions
            .iter()
            .find(|r| normalize_region(&r.display_name) == wanted)
            .map(|r| r.slug.as_str())
    }

    fn price(&self, offer: &str, slug: &str) -> Option<f64> {
        let prices = &self.offers.get(offer)?.prices;
        prices
            .get(slug)
            .or_else(|| prices.get(GLOBAL_SLUG))
            .map(|p| p.value)
    }

    /// Build the price table for `location`
    pub fn resolve(&self, location: &str) -> std::result::Result<PriceTable, PriceResolutionError> {
        if self.regions.is_empty() {
            return Err(PriceResolutionError::Catalog(
                "catalog lists no regions".to_string(),
            ));
        }

        let slug = self
            .find_region_slug(location)
            .ok_or_else(|| PriceResolutionError::RegionMismatch {
                location: location.to_string(),
                candidates: self.regions.len(),
            })?;

        let mut unit_prices = BTreeMap::new();
        for (category, offer) in OFFER_KEYS {
            let raw = self
                .price(offer, slug)
                .ok_or_else(|| PriceResolutionError::MissingPrice {
                    category,
                    slug: slug.to_string(),
                })?;
            let unit_price = raw * catalog_scale(category);
            debug!("{} in {}: {} ({} raw)", category, slug, unit_price, raw);
            unit_prices.insert(category, unit_price);
        }

        Ok(PriceTable {
            region_slug: slug.to_string(),
            unit_prices,
        })
    }
}

fn normalize_region(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Fetches the catalog once and resolves regions against it
pub struct PriceResolver {
    transport: Arc<dyn Transport>,
    catalog_url: String,
    cache: RwLock<Option<Arc<PricingCatalog>>>,
}

impl PriceResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            catalog_url: PRICING_CATALOG_URL.to_string(),
            cache: RwLock::new(None),
        }
    }

    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    /// Resolve against a preloaded snapshot instead of the live catalog
    pub fn with_catalog(self, catalog: PricingCatalog) -> Self {
        Self {
            cache: RwLock::new(Some(Arc::new(catalog))),
            ..self
        }
    }

    /// Price table for the region the factory is deployed in
    pub async fn resolve(&self, region_display_name: &str) -> Result<PriceTable> {
        let catalog = self.catalog().await?;
        let table = catalog.resolve(region_display_name)?;
        info!(
            "Resolved pricing region {} for {}",
            table.region_slug, region_display_name
        );
        Ok(table)
    }

    async fn catalog(&self) -> Result<Arc<PricingCatalog>> {
        {
            let cache = self.cache.read().await;
            if let Some(catalog) = cache.as_ref() {
                return Ok(Arc::clone(catalog));
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(catalog) = cache.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        info!("Fetching pricing catalog from {}", self.catalog_url);
        let document = self.transport.get_json(&self.catalog_url, None).await?;
        let catalog: PricingCatalog = serde_json::from_value(document)?;
        let catalog = Arc::new(catalog);
        *cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }
}

//! Rate catalog resolution and report assembly for adfcost
//!
//! This crate turns the public Data Factory rate catalog into a region
//! price table and prices aggregated usage into the final report.

pub mod price_resolver;
pub mod report_assembler;

pub use price_resolver::{PRICING_CATALOG_URL, PriceResolver, PricingCatalog};
pub use report_assembler::ReportAssembler;

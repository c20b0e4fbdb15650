//! Error types for adfcost
//!
//! This module defines the error types used throughout the adfcost crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Every variant except the transient transport ones is fatal for a job: a
//! partially fetched dataset would undercount usage, so callers propagate
//! errors up to `main` instead of recovering.
//!
//! # Example
//!
//! ```
//! use adfcost_core::error::{AdfCostError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to AdfCostError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::types::Category;

/// Main error type for adfcost operations
#[derive(Error, Debug)]
pub enum AdfCostError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The identity provider could not hand back a bearer credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A request completed with a non-success status
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Request URL
        url: String,
        /// Response body or reason phrase
        message: String,
    },

    /// A page of a paginated listing could not be fetched
    #[error("Pagination failed for {endpoint} on page {page}: {source}")]
    Pagination {
        /// Endpoint being listed
        endpoint: String,
        /// One-based page number that failed
        page: usize,
        /// Underlying failure
        #[source]
        source: Box<AdfCostError>,
    },

    /// A response was well-formed but could not be acted on
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unit prices could not be resolved
    #[error(transparent)]
    PriceResolution(#[from] PriceResolutionError),

    /// The requested date window is not ordered
    #[error("Invalid date window: {0}")]
    InvalidDateWindow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AdfCostError {
    /// Whether retrying the same request could succeed.
    ///
    /// Network failures, throttling (429) and server errors (5xx) are
    /// transient; everything else is returned to the caller immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Failures while turning the public rate catalog into a [`crate::aggregation_types::PriceTable`]
#[derive(Error, Debug)]
pub enum PriceResolutionError {
    /// No catalog region matches the factory location
    #[error("No pricing region matches location '{location}' ({candidates} regions in catalog)")]
    RegionMismatch {
        /// Factory location as reported by the management API
        location: String,
        /// Number of regions the catalog offered
        candidates: usize,
    },

    /// The catalog has no price for a category in the resolved region
    #[error("No price for {category} in region '{slug}'")]
    MissingPrice {
        /// Category lacking a price
        category: Category,
        /// Resolved region slug
        slug: String,
    },

    /// The catalog document did not have the expected shape
    #[error("Malformed pricing catalog: {0}")]
    Catalog(String),
}

/// Convenience type alias for Results in adfcost
///
/// # Example
///
/// ```
/// use adfcost_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, AdfCostError>;

//! Azure management API client for adfcost
//!
//! This crate owns everything that talks to the network on behalf of a job:
//! bearer-credential lifecycle, the JSON transport with timeout and retry,
//! continuation-token pagination, and the pipeline-run / activity-run
//! traversal built on top of it.

pub mod credential;
pub mod endpoints;
pub mod pager;
pub mod token_source;
pub mod transport;
pub mod traversal;

#[cfg(test)]
pub(crate) mod test_utils;

pub use credential::{CredentialManager, TokenSource};
pub use endpoints::FactoryScope;
pub use pager::{Paged, PagedCollectionFetcher};
pub use token_source::{AzureCliTokenSource, ClientSecretTokenSource, StaticTokenSource};
pub use transport::{ReqwestTransport, RetryPolicy, Transport};
pub use traversal::{RunTraversal, RunWithActivities};

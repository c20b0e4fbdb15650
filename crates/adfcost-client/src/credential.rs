//! Bearer credential lifecycle
//!
//! [`CredentialManager`] owns the current management-API credential and
//! decides, before every request, whether it can be reused or must be
//! re-acquired from the [`TokenSource`]. A job runs for hours while access
//! tokens live for about one, so the check is proactive: anything expiring
//! within [`REFRESH_MARGIN_SECS`] is replaced before use.

use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::Credential;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How long, in seconds, a credential must remain valid to be reused
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Something that can perform a full authentication handshake
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a fresh credential from the identity provider
    async fn fetch_credential(&self) -> Result<Credential>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Single owner of the current credential
///
/// All refresh decisions go through one async mutex, so concurrent requests
/// never race on "refresh or reuse".
pub struct CredentialManager {
    source: Arc<dyn TokenSource>,
    margin: Duration,
    current: Mutex<Option<Credential>>,
    handshakes: AtomicUsize,
}

impl CredentialManager {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            margin: Duration::seconds(REFRESH_MARGIN_SECS),
            current: Mutex::new(None),
            handshakes: AtomicUsize::new(0),
        }
    }

    /// Return `prior` if it stays valid past the refresh margin, otherwise
    /// perform a new handshake
    pub async fn acquire(&self, prior: Option<&Credential>) -> Result<Credential> {
        self.acquire_at(prior, Utc::now()).await
    }

    /// [`Self::acquire`] against an explicit clock
    pub async fn acquire_at(
        &self,
        prior: Option<&Credential>,
        now: DateTime<Utc>,
    ) -> Result<Credential> {
        if let Some(credential) = prior {
            if credential.is_fresh_at(now, self.margin) {
                return Ok(credential.clone());
            }
            debug!(
                "Credential expires at {}, refreshing",
                credential.expires_at().to_rfc3339()
            );
        }

        self.handshakes.fetch_add(1, Ordering::Relaxed);
        let credential = self.source.fetch_credential().await.map_err(|e| match e {
            AdfCostError::Authentication(_) => e,
            other => AdfCostError::Authentication(format!("{}: {}", self.source.name(), other)),
        })?;

        if !credential.is_fresh_at(now, self.margin) {
            warn!(
                "{} issued a credential that expires within the refresh margin ({})",
                self.source.name(),
                credential.expires_at().to_rfc3339()
            );
        }
        info!(
            "Acquired credential from {} (expires {})",
            self.source.name(),
            credential.expires_at().to_rfc3339()
        );
        Ok(credential)
    }

    /// A credential valid for the next request, refreshing the stored one if needed
    pub async fn current(&self) -> Result<Credential> {
        let mut guard = self.current.lock().await;
        let credential = self.acquire(guard.as_ref()).await?;
        *guard = Some(credential.clone());
        Ok(credential)
    }

    /// Number of handshakes performed so far
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::Relaxed)
    }
}

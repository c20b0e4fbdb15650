//! Non-interactive identity providers
//!
//! Interactive login is left to the Azure CLI; these sources only turn an
//! existing login, a service principal, or a pre-issued token into a
//! [`Credential`].

use crate::credential::TokenSource;
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::Credential;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

/// Resource the management-API tokens are issued for
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";
/// Client-credentials scope for the management API
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
/// Default Entra ID authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tokens from `az account get-access-token`
pub struct AzureCliTokenSource {
    program: String,
    subscription_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2024-01-15 11:22:33.000000`
    #[serde(default)]
    expires_on: Option<String>,
    /// Epoch seconds; newer CLI versions only
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl AzureCliTokenSource {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            program: "az".to_string(),
            subscription_id: subscription_id.into(),
        }
    }

    /// Use a different executable, e.g. `az.cmd`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Parse the CLI's JSON token document
    pub fn parse_token(stdout: &[u8]) -> Result<Credential> {
        let token: CliToken = serde_json::from_slice(stdout)
            .map_err(|e| AdfCostError::Authentication(format!("unreadable az output: {e}")))?;

        let expires_at = match (token.expires_on_epoch, token.expires_on.as_deref()) {
            (Some(epoch), _) => DateTime::<Utc>::from_timestamp(epoch, 0).ok_or_else(|| {
                AdfCostError::Authentication(format!("invalid expires_on {epoch}"))
            })?,
            (None, Some(local)) => parse_local_expiry(local)?,
            (None, None) => {
                return Err(AdfCostError::Authentication(
                    "az output has no expiry".to_string(),
                ));
            }
        };

        Ok(Credential::bearer(&token.access_token, expires_at))
    }
}

fn parse_local_expiry(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| AdfCostError::Authentication(format!("invalid expiresOn '{raw}': {e}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AdfCostError::Authentication(format!("ambiguous expiresOn '{raw}'")))
}

#[async_trait]
impl TokenSource for AzureCliTokenSource {
    async fn fetch_credential(&self) -> Result<Credential> {
        debug!("Requesting token via {} for {}", self.program, self.subscription_id);
        let output = tokio::process::Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                MANAGEMENT_RESOURCE,
                "--subscription",
                &self.subscription_id,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| AdfCostError::Authentication(format!("cannot run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdfCostError::Authentication(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Self::parse_token(&output.stdout)
    }

    fn name(&self) -> &'static str {
        "azure-cli"
    }
}

/// OAuth2 client-credentials flow for a service principal
pub struct ClientSecretTokenSource {
    client: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ClientSecretTokenSource {
    pub fn new(
        client: reqwest::Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Use a sovereign-cloud authority
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Turn a token-endpoint reply into a credential issued at `now`
    pub fn parse_token_response(
        status: u16,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential> {
        if !(200..300).contains(&status) {
            let detail = serde_json::from_str::<OAuthErrorResponse>(body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(AdfCostError::Authentication(format!(
                "token endpoint returned {status}: {detail}"
            )));
        }

        let token: OAuthTokenResponse = serde_json::from_str(body).map_err(|e| {
            AdfCostError::Authentication(format!("unreadable token response: {e}"))
        })?;
        Ok(Credential::bearer(
            &token.access_token,
            now + Duration::seconds(token.expires_in),
        ))
    }
}

#[async_trait]
impl TokenSource for ClientSecretTokenSource {
    async fn fetch_credential(&self) -> Result<Credential> {
        let url = self.token_url();
        debug!("Requesting client-credentials token from {}", url);
        let issued_at = Utc::now();

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| AdfCostError::Authentication(format!("cannot reach {url}: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AdfCostError::Authentication(format!("cannot read token reply: {e}")))?;

        Self::parse_token_response(status, &body, issued_at)
    }

    fn name(&self) -> &'static str {
        "client-secret"
    }
}

/// A token handed in from outside
///
/// It cannot be renewed, so once it enters the refresh margin every
/// request re-reads the same value and the API will start rejecting it.
pub struct StaticTokenSource {
    credential: Credential,
}

impl StaticTokenSource {
    pub fn new(access_token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            credential: Credential::bearer(access_token, expires_at),
        }
    }

    /// A token assumed to be valid for one hour from now
    pub fn valid_for_an_hour(access_token: &str) -> Self {
        Self::new(access_token, Utc::now() + Duration::hours(1))
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_credential(&self) -> Result<Credential> {
        Ok(self.credential.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

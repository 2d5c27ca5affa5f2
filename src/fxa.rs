use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

/// Revokes OAuth grants held on behalf of a subscriber. Revocation is
/// best-effort: callers log failures and carry on.
pub trait IdentityRevoker: Send + Sync + 'static {
    /// `None` means the subscriber never linked an account.
    fn revoke(
        &self,
        refresh_token: Option<&Secret<String>>,
    ) -> impl Future<Output = Result<(), anyhow::Error>> + Send;
}

/// Firefox Accounts OAuth client
pub struct FxaClient {
    http_client: Client,
    oauth_origin: String,
}

#[derive(Serialize)]
struct DestroyRequest<'a> {
    refresh_token: &'a str,
}

impl FxaClient {
    pub fn new(
        oauth_origin: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            oauth_origin,
        })
    }
}

impl IdentityRevoker for FxaClient {
    #[tracing::instrument(name = "Revoking FXA refresh token", skip_all)]
    async fn revoke(
        &self,
        refresh_token: Option<&Secret<String>>,
    ) -> Result<(), anyhow::Error> {
        let Some(refresh_token) = refresh_token else {
            tracing::debug!("no FXA grant linked, nothing to revoke");
            return Ok(());
        };
        let url = format!("{}/v1/destroy", self.oauth_origin);
        self.http_client
            .post(&url)
            .json(&DestroyRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await
            .context("Failed to reach the FXA OAuth server")?
            .error_for_status()
            .context("The FXA OAuth server refused to destroy the token")?;
        Ok(())
    }
}

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

use crate::domain::SubscriberEmail;

/// Every outgoing email uses this template; `EmailContext.which_view` picks
/// the partial rendered inside it.
pub const DEFAULT_TEMPLATE: &str = "default_email";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EmailView {
    /// Sent on signup; carries the verify link
    #[serde(rename = "email_partials/email_verify")]
    Verify,
    /// Sent once, when the address is verified
    #[serde(rename = "email_partials/report")]
    Report,
}

/// Template model, serialized as-is into the email API request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailContext {
    pub subject: String,
    pub email: String,
    pub which_view: EmailView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
    pub unsubscribe_url: String,
}

/// Anything that can deliver a templated email. Failures are returned, not
/// swallowed: signup and verification must fail loudly when mail cannot go
/// out.
pub trait EmailDispatcher: Send + Sync + 'static {
    fn send(
        &self,
        template_id: &str,
        recipient: &SubscriberEmail,
        context: &EmailContext,
    ) -> impl Future<Output = Result<(), anyhow::Error>> + Send;
}

/// Client for a Postmark-compatible transactional email API.
///
/// Establishing a HTTP connection is expensive, so one `EmailClient` (and its
/// connection pool) is built at startup and shared through `web::Data`.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    authorization_token: Secret<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    template_alias: &'a str,
    template_model: &'a EmailContext,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        authorization_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        })
    }
}

impl EmailDispatcher for EmailClient {
    #[tracing::instrument(
        name = "Sending templated email",
        skip(self, recipient, context),
        fields(which_view = ?context.which_view)
    )]
    async fn send(
        &self,
        template_id: &str,
        recipient: &SubscriberEmail,
        context: &EmailContext,
    ) -> Result<(), anyhow::Error> {
        let url = format!("{}/email/withTemplate", self.base_url);
        let body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            template_alias: template_id,
            template_model: context,
        };
        self.http_client
            .post(&url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&body)
            .send()
            .await
            .context("Failed to reach the email API")?
            // 4xx/5xx are not transport errors, so they must be surfaced explicitly
            .error_for_status()
            .context("The email API rejected the request")?;
        Ok(())
    }
}

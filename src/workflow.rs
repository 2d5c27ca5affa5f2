//! Signup, verification and unsubscribe.
//!
//! Each operation takes raw request values, parses them into domain types and
//! drives the store, the email dispatcher and the identity revoker. Nothing
//! here knows about HTTP; see `routes::user` for the request boundary.

use std::fmt::Debug;

use crate::domain::EmailHash;
use crate::domain::NewSubscriber;
use crate::domain::SignupLanguage;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::VerificationToken;
use crate::email_client::EmailContext;
use crate::email_client::EmailDispatcher;
use crate::email_client::EmailView;
use crate::email_client::DEFAULT_TEMPLATE;
use crate::fxa::IdentityRevoker;
use crate::store::SubscriberStore;
use crate::store::Verification;
use crate::utils::error_chain_fmt;

/// Request-scoped inputs to `add` that do not come from the form itself
#[derive(Debug, Clone)]
pub struct SignupContext {
    pub signup_language: SignupLanguage,
}

#[derive(thiserror::Error)]
pub enum SubscriberError {
    #[error("{0}")]
    InvalidEmail(String),
    #[error("This email address is not subscribed.")]
    NotSubscribed,
    #[error("Failed to send a notification email")]
    DispatchFailure(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SubscriberError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

// malformed capabilities are indistinguishable from unknown ones to the caller
fn parse_token(token: &str) -> Result<VerificationToken, SubscriberError> {
    VerificationToken::parse(token.to_string()).map_err(|_| SubscriberError::NotSubscribed)
}

fn parse_hash(hash: &str) -> Result<EmailHash, SubscriberError> {
    EmailHash::parse(hash.to_string()).map_err(|_| SubscriberError::NotSubscribed)
}

pub struct SubscriberWorkflow<S, E, R> {
    store: S,
    email_client: E,
    revoker: R,
    /// Public origin for links in emails, without trailing slash
    base_url: String,
}

impl<S, E, R> SubscriberWorkflow<S, E, R>
where
    S: SubscriberStore,
    E: EmailDispatcher,
    R: IdentityRevoker,
{
    pub fn new(
        store: S,
        email_client: E,
        revoker: R,
        base_url: String,
    ) -> Self {
        Self {
            store,
            email_client,
            revoker,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn verify_url(
        &self,
        token: &VerificationToken,
    ) -> String {
        format!(
            "{}/user/verify?token={}",
            self.base_url,
            urlencoding::encode(token.as_ref())
        )
    }

    pub fn unsubscribe_url(
        &self,
        subscriber: &Subscriber,
    ) -> String {
        format!(
            "{}/user/unsubscribe?token={}&hash={}",
            self.base_url,
            urlencoding::encode(subscriber.verification_token.as_ref()),
            urlencoding::encode(subscriber.email_hash.as_ref()),
        )
    }

    /// Register `email` as a pending subscriber and mail it a verification
    /// link.
    ///
    /// Re-adding a pending address refreshes its signup details and re-sends
    /// the same link. Re-adding a verified address changes nothing and sends
    /// nothing; the caller gets the same response either way.
    #[tracing::instrument(
        name = "Adding new subscriber",
        skip(self, email, ctx),
        fields(
            subscriber_email = %email,
            signup_language = %ctx.signup_language.as_ref(),
        )
    )]
    pub async fn add(
        &self,
        email: String,
        fx_newsletter: bool,
        ctx: &SignupContext,
    ) -> Result<(), SubscriberError> {
        let email = SubscriberEmail::parse(email).map_err(SubscriberError::InvalidEmail)?;
        let new_sub = NewSubscriber::new(email, ctx.signup_language.clone(), fx_newsletter);
        let subscriber = self.store.upsert(&new_sub).await?;

        if subscriber.verified {
            tracing::info!("subscriber already verified, not sending another link");
            return Ok(());
        }
        self.send_verification_email(&subscriber).await
    }

    /// Flip the subscriber owning `token` to verified. Only the call that
    /// performs the transition sends the confirmation email.
    #[tracing::instrument(name = "Verifying subscriber", skip_all)]
    pub async fn verify(
        &self,
        token: &str,
    ) -> Result<Subscriber, SubscriberError> {
        let token = parse_token(token)?;
        match self.store.mark_verified(&token).await? {
            None => Err(SubscriberError::NotSubscribed),
            Some(Verification::AlreadyVerified(subscriber)) => {
                tracing::info!("subscriber was already verified");
                Ok(subscriber)
            }
            Some(Verification::Verified(subscriber)) => {
                self.send_report_email(&subscriber).await?;
                Ok(subscriber)
            }
        }
    }

    /// Read-only check behind the unsubscribe confirmation page.
    #[tracing::instrument(name = "Looking up unsubscribe request", skip_all)]
    pub async fn get_unsubscribe(
        &self,
        token: &str,
        hash: &str,
    ) -> Result<Subscriber, SubscriberError> {
        let (token, hash) = (parse_token(token)?, parse_hash(hash)?);
        self.store
            .find_by_token(&token)
            .await?
            .filter(|s| s.owns_hash(&hash))
            .ok_or(SubscriberError::NotSubscribed)
    }

    /// Delete the subscriber, then revoke any linked FXA grant. Revocation
    /// failures are logged; the deletion stands regardless.
    #[tracing::instrument(
        name = "Unsubscribing",
        skip_all,
        fields(subscriber_id = tracing::field::Empty)
    )]
    pub async fn post_unsubscribe(
        &self,
        token: &str,
        hash: &str,
    ) -> Result<(), SubscriberError> {
        let (token, hash) = (parse_token(token)?, parse_hash(hash)?);
        let subscriber = self
            .store
            .delete(&token, &hash)
            .await?
            .ok_or(SubscriberError::NotSubscribed)?;
        tracing::Span::current().record("subscriber_id", tracing::field::display(subscriber.id));

        if let Err(e) = self
            .revoker
            .revoke(subscriber.fxa_refresh_token.as_ref())
            .await
        {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "failed to revoke FXA grant of deleted subscriber"
            );
        }
        Ok(())
    }

    async fn send_verification_email(
        &self,
        subscriber: &Subscriber,
    ) -> Result<(), SubscriberError> {
        let context = EmailContext {
            subject: "Verify your email address for breach alerts".to_string(),
            email: subscriber.email.as_ref().to_string(),
            which_view: EmailView::Verify,
            verify_url: Some(self.verify_url(&subscriber.verification_token)),
            unsubscribe_url: self.unsubscribe_url(subscriber),
        };
        self.email_client
            .send(DEFAULT_TEMPLATE, &subscriber.email, &context)
            .await
            .map_err(SubscriberError::DispatchFailure)
    }

    async fn send_report_email(
        &self,
        subscriber: &Subscriber,
    ) -> Result<(), SubscriberError> {
        let context = EmailContext {
            subject: "Your breach alerts are now active".to_string(),
            email: subscriber.email.as_ref().to_string(),
            which_view: EmailView::Report,
            verify_url: None,
            unsubscribe_url: self.unsubscribe_url(subscriber),
        };
        self.email_client
            .send(DEFAULT_TEMPLATE, &subscriber.email, &context)
            .await
            .map_err(SubscriberError::DispatchFailure)
    }
}

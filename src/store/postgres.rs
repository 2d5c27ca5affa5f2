use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use secrecy::Secret;
use sqlx::PgPool;
use uuid::Uuid;

use super::SubscriberStore;
use super::Verification;
use crate::domain::EmailHash;
use crate::domain::NewSubscriber;
use crate::domain::SignupLanguage;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::VerificationToken;

const COLUMNS: &str = "id, email, email_hash, verification_token, verified, signup_language, \
                       fx_newsletter, fxa_refresh_token, created_at, updated_at";

/// Raw `subscribers` row. Converted into a `Subscriber` only after the stored
/// values are re-parsed; rows written by older versions cannot be assumed
/// valid.
#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    email_hash: String,
    verification_token: String,
    verified: bool,
    signup_language: String,
    fx_newsletter: bool,
    fxa_refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = anyhow::Error;
    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            email: SubscriberEmail::parse(row.email).map_err(|e| anyhow::anyhow!(e))?,
            email_hash: EmailHash::parse(row.email_hash).map_err(|e| anyhow::anyhow!(e))?,
            verification_token: VerificationToken::parse(row.verification_token)
                .map_err(|e| anyhow::anyhow!(e))?,
            verified: row.verified,
            signup_language: SignupLanguage::from_header(Some(&row.signup_language)),
            fx_newsletter: row.fx_newsletter,
            fxa_refresh_token: row.fxa_refresh_token.map(Secret::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_subscriber(row: Option<SubscriberRow>) -> Result<Option<Subscriber>, anyhow::Error> {
    row.map(Subscriber::try_from).transpose()
}

/// `SubscriberStore` backed by the `subscribers` table.
///
/// Queries are built at runtime (`query_as`) rather than with `query!`, so the
/// crate builds without a live database or an offline `.sqlx` cache.
#[derive(Clone)]
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub fn pool(&self) -> &PgPool { &self.pool }

    async fn find_by_hash(
        &self,
        hash: &EmailHash,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let sql = format!("SELECT {COLUMNS} FROM subscribers WHERE email_hash = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(hash.as_ref())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up subscriber by email hash")?;
        into_subscriber(row)
    }
}

impl SubscriberStore for PgSubscriberStore {
    #[tracing::instrument(name = "SELECTing subscriber by email", skip_all)]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        self.find_by_hash(&email.hash()).await
    }

    #[tracing::instrument(name = "SELECTing subscriber by token", skip_all)]
    async fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let sql = format!("SELECT {COLUMNS} FROM subscribers WHERE verification_token = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(token.as_ref())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up subscriber by token")?;
        into_subscriber(row)
    }

    #[tracing::instrument(name = "UPSERTing pending subscriber", skip_all)]
    async fn upsert(
        &self,
        new: &NewSubscriber,
    ) -> Result<Subscriber, anyhow::Error> {
        // the conflict arm only fires for pending records; a verified record
        // yields no row and is fetched separately below
        let sql = format!(
            r#"
        INSERT INTO subscribers
            (id, email, email_hash, verification_token, verified, signup_language,
             fx_newsletter, created_at, updated_at)
        VALUES
            ($1, $2, $3, $4, false, $5, $6, now(), now())
        ON CONFLICT (email_hash) DO UPDATE SET
            signup_language = EXCLUDED.signup_language,
            fx_newsletter = EXCLUDED.fx_newsletter,
            updated_at = EXCLUDED.updated_at
        WHERE NOT subscribers.verified
        RETURNING {COLUMNS}
        "#
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.email.as_ref())
            .bind(new.email_hash.as_ref())
            .bind(new.verification_token.as_ref())
            .bind(new.signup_language.as_ref())
            .bind(new.fx_newsletter)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to upsert subscriber")?;

        match into_subscriber(row)? {
            Some(subscriber) => Ok(subscriber),
            None => self
                .find_by_hash(&new.email_hash)
                .await?
                .context("Subscriber vanished between upsert and lookup"),
        }
    }

    #[tracing::instrument(name = "UPDATEing subscriber to verified", skip_all)]
    async fn mark_verified(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Verification>, anyhow::Error> {
        let sql = format!(
            r#"
        UPDATE subscribers
        SET verified = true, updated_at = now()
        WHERE verification_token = $1 AND NOT verified
        RETURNING {COLUMNS}
        "#
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(token.as_ref())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to mark subscriber as verified")?;

        if let Some(subscriber) = into_subscriber(row)? {
            return Ok(Some(Verification::Verified(subscriber)));
        }
        Ok(self
            .find_by_token(token)
            .await?
            .map(Verification::AlreadyVerified))
    }

    #[tracing::instrument(name = "DELETEing subscriber", skip_all)]
    async fn delete(
        &self,
        token: &VerificationToken,
        hash: &EmailHash,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let sql = format!(
            r#"
        DELETE FROM subscribers
        WHERE verification_token = $1 AND email_hash = $2
        RETURNING {COLUMNS}
        "#
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(token.as_ref())
            .bind(hash.as_ref())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to delete subscriber")?;
        into_subscriber(row)
    }
}

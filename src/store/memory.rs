use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chrono::Utc;
use uuid::Uuid;

use super::SubscriberStore;
use super::Verification;
use crate::domain::EmailHash;
use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::VerificationToken;

/// Process-local `SubscriberStore`, keyed by email hash. Every operation runs
/// under one lock, which gives the same atomicity as the single-statement
/// Postgres queries. The lock is never held across an `.await`.
#[derive(Default)]
pub struct InMemorySubscriberStore {
    subscribers: Mutex<HashMap<String, Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Subscriber>>, anyhow::Error> {
        self.subscribers
            .lock()
            .map_err(|_| anyhow::anyhow!("Subscriber store lock was poisoned"))
    }

    /// Insert (or overwrite) a complete record, e.g. one linked to an FXA
    /// account.
    pub fn insert(
        &self,
        subscriber: Subscriber,
    ) -> Result<(), anyhow::Error> {
        self.lock()?
            .insert(subscriber.email_hash.as_ref().to_string(), subscriber);
        Ok(())
    }

    /// Snapshot of every record, in no particular order
    pub fn subscribers(&self) -> Result<Vec<Subscriber>, anyhow::Error> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

impl SubscriberStore for InMemorySubscriberStore {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        Ok(self.lock()?.get(email.hash().as_ref()).cloned())
    }

    async fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        Ok(self
            .lock()?
            .values()
            .find(|s| &s.verification_token == token)
            .cloned())
    }

    async fn upsert(
        &self,
        new: &NewSubscriber,
    ) -> Result<Subscriber, anyhow::Error> {
        let mut subscribers = self.lock()?;
        let now = Utc::now();
        let subscriber = subscribers
            .entry(new.email_hash.as_ref().to_string())
            .and_modify(|s| {
                if !s.verified {
                    s.signup_language = new.signup_language.clone();
                    s.fx_newsletter = new.fx_newsletter;
                    s.updated_at = now;
                }
            })
            .or_insert_with(|| Subscriber {
                id: Uuid::new_v4(),
                email: new.email.clone(),
                email_hash: new.email_hash.clone(),
                verification_token: new.verification_token.clone(),
                verified: false,
                signup_language: new.signup_language.clone(),
                fx_newsletter: new.fx_newsletter,
                fxa_refresh_token: None,
                created_at: now,
                updated_at: now,
            });
        Ok(subscriber.clone())
    }

    async fn mark_verified(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Verification>, anyhow::Error> {
        let mut subscribers = self.lock()?;
        let Some(subscriber) = subscribers
            .values_mut()
            .find(|s| &s.verification_token == token)
        else {
            return Ok(None);
        };
        if subscriber.verified {
            return Ok(Some(Verification::AlreadyVerified(subscriber.clone())));
        }
        subscriber.verified = true;
        subscriber.updated_at = Utc::now();
        Ok(Some(Verification::Verified(subscriber.clone())))
    }

    async fn delete(
        &self,
        token: &VerificationToken,
        hash: &EmailHash,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let mut subscribers = self.lock()?;
        let matches = subscribers
            .get(hash.as_ref())
            .is_some_and(|s| &s.verification_token == token);
        Ok(match matches {
            true => subscribers.remove(hash.as_ref()),
            false => None,
        })
    }
}

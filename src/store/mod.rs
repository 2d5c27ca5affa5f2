//! Persistence of subscribers.
//!
//! The store is the only shared state between requests, so it owns every
//! atomicity guarantee: `upsert` converges concurrent signups for one address
//! onto a single record, and `mark_verified` is a compare-and-set so that only
//! one caller ever observes the unverified -> verified transition.

mod memory;
mod postgres;

use std::future::Future;
use std::sync::Arc;

pub use memory::InMemorySubscriberStore;
pub use postgres::PgSubscriberStore;

use crate::domain::EmailHash;
use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::VerificationToken;

/// Outcome of `SubscriberStore::mark_verified` for a known token
#[derive(Debug)]
pub enum Verification {
    /// This call flipped `verified` to true
    Verified(Subscriber),
    /// Someone (possibly a concurrent request) got there first
    AlreadyVerified(Subscriber),
}

pub trait SubscriberStore: Send + Sync + 'static {
    fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send;

    fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send;

    /// Insert `new` if no record shares its email hash. An existing pending
    /// record has its signup details refreshed but keeps its token; a verified
    /// record is returned untouched.
    fn upsert(
        &self,
        new: &NewSubscriber,
    ) -> impl Future<Output = Result<Subscriber, anyhow::Error>> + Send;

    /// `None` if the token is unknown.
    fn mark_verified(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<Option<Verification>, anyhow::Error>> + Send;

    /// Delete the record matching both token and hash, returning it.
    fn delete(
        &self,
        token: &VerificationToken,
        hash: &EmailHash,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send;
}

/// Lets a caller keep a handle on the store it hands to the app (tests inspect
/// the in-memory store this way).
impl<T: SubscriberStore> SubscriberStore for Arc<T> {
    fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send {
        (**self).find_by_email(email)
    }

    fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send {
        (**self).find_by_token(token)
    }

    fn upsert(
        &self,
        new: &NewSubscriber,
    ) -> impl Future<Output = Result<Subscriber, anyhow::Error>> + Send {
        (**self).upsert(new)
    }

    fn mark_verified(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<Option<Verification>, anyhow::Error>> + Send {
        (**self).mark_verified(token)
    }

    fn delete(
        &self,
        token: &VerificationToken,
        hash: &EmailHash,
    ) -> impl Future<Output = Result<Option<Subscriber>, anyhow::Error>> + Send {
        (**self).delete(token, hash)
    }
}

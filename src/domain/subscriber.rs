use chrono::DateTime;
use chrono::Utc;
use secrecy::Secret;
use uuid::Uuid;

use super::EmailHash;
use super::SignupLanguage;
use super::SubscriberEmail;
use super::VerificationToken;

/// A persisted subscriber.
///
/// Lifecycle: created with `verified == false`; `verified` becomes `true` at
/// most once; the record is deleted on unsubscribe. There are no other
/// transitions.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub email_hash: EmailHash,
    pub verification_token: VerificationToken,
    pub verified: bool,
    pub signup_language: SignupLanguage,
    pub fx_newsletter: bool,
    /// Set when the subscriber signed in with Firefox Accounts
    pub fxa_refresh_token: Option<Secret<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    /// Whether `hash` was computed from this subscriber's email.
    pub fn owns_hash(
        &self,
        hash: &EmailHash,
    ) -> bool {
        &self.email_hash == hash
    }
}

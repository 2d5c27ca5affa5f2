use super::EmailHash;
use super::SignupLanguage;
use super::SubscriberEmail;
use super::VerificationToken;

/// A parsed signup, not yet persisted. `verification_token` is only a
/// candidate: if a pending record already exists for the same email hash, the
/// store keeps the existing token.
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub email_hash: EmailHash,
    pub verification_token: VerificationToken,
    pub signup_language: SignupLanguage,
    pub fx_newsletter: bool,
}

impl NewSubscriber {
    pub fn new(
        email: SubscriberEmail,
        signup_language: SignupLanguage,
        fx_newsletter: bool,
    ) -> Self {
        Self {
            email_hash: email.hash(),
            email,
            verification_token: VerificationToken::generate(),
            signup_language,
            fx_newsletter,
        }
    }
}

use std::fmt::Display;

use validator::ValidateEmail;

use super::EmailHash;

/// A parsed email address, used for both senders and recipients.
///
/// The address is kept as submitted; case-insensitive identity is carried by
/// `EmailHash`, which is computed over the lower-cased form.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_string();
        ValidateEmail::validate_email(&email)
            .then_some(Self(email.clone()))
            .ok_or(format!("Invalid email: {email:?}"))
    }

    pub fn hash(&self) -> EmailHash { EmailHash::of(self) }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

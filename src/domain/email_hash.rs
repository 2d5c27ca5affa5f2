use sha1::Digest;
use sha1::Sha1;

use super::SubscriberEmail;

/// Uppercase hex SHA-1 of the lower-cased email address.
///
/// This is the normalised identity of a subscriber (two addresses differing
/// only in case share a hash) and the second factor of unsubscribe links: a
/// token alone is not enough to unsubscribe, the caller must also know whose
/// token it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailHash(String);

impl EmailHash {
    const LEN: usize = 40;

    pub fn of(email: &SubscriberEmail) -> Self {
        let digest = Sha1::digest(email.as_ref().to_lowercase().as_bytes());
        Self(hex::encode_upper(digest))
    }

    /// Accepts either hex case, as browsers and older links differ.
    pub fn parse(hash: String) -> Result<Self, String> {
        let hash = hash.trim();
        match hash.len() == Self::LEN && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            true => Ok(Self(hash.to_ascii_uppercase())),
            false => Err(format!("Invalid email hash: {hash:?}")),
        }
    }
}

impl AsRef<str> for EmailHash {
    fn as_ref(&self) -> &str { &self.0 }
}

use rand::distributions::Alphanumeric;
use rand::thread_rng;
use rand::Rng;

/// Bearer capability proving control of a signup. Possession of the token is
/// what authorises verify/unsubscribe, so it is kept distinct from
/// `SubscriberEmail` and its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VerificationToken(String);

impl VerificationToken {
    const LEN: usize = 25;

    /// 25 alphanumerics give ~10^45 possible tokens; collisions are rejected by
    /// the store's unique constraint anyway.
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        let token = std::iter::repeat_with(|| rng.sample(Alphanumeric))
            .map(char::from)
            .take(Self::LEN)
            .collect();
        Self(token)
    }

    pub fn parse(token: String) -> Result<Self, String> {
        match token.len() == Self::LEN && token.chars().all(|c| c.is_ascii_alphanumeric()) {
            true => Ok(Self(token)),
            false => Err("Malformed verification token".to_string()),
        }
    }
}

impl AsRef<str> for VerificationToken {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Debug for VerificationToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str("VerificationToken([REDACTED])")
    }
}

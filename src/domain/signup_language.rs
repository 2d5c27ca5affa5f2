/// Raw `Accept-Language` value of the signup request, e.g. `en-US,en;q=0.5`.
/// Used later to pick the language of alert emails.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupLanguage(String);

impl SignupLanguage {
    const MAX_CHARS: usize = 255;

    /// Never fails: a missing header is recorded as an empty string, and
    /// oversized headers are truncated.
    pub fn from_header(value: Option<&str>) -> Self {
        let value = value.unwrap_or_default().trim();
        Self(value.chars().take(Self::MAX_CHARS).collect())
    }

    /// Like `from_header`, for raw header bytes. Header values may carry
    /// non-ASCII (obs-text) bytes; those are decoded lossily as UTF-8.
    pub fn from_header_bytes(value: Option<&[u8]>) -> Self {
        let value = value.map(String::from_utf8_lossy);
        Self::from_header(value.as_deref())
    }
}

impl AsRef<str> for SignupLanguage {
    fn as_ref(&self) -> &str { &self.0 }
}

//! The one-time credential delivered through the page URL.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use url::Url;

/// Query parameter carrying the credential.
pub const TOKEN_PARAM: &str = "token";

/// An opaque session credential.
///
/// The value is never printed by `Debug` and only leaves the type through
/// [`Credential::expose`], which callers use to persist it.
pub struct Credential(SecretString);

impl Credential {
    /// Wraps a raw credential.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// The raw credential.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Constant-time comparison against a value read back from storage.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.expose().as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Whether the credential embeds `_<id>_`.
    #[must_use]
    pub fn embeds_identity(&self, id: &str) -> bool {
        !id.is_empty() && self.expose().contains(&format!("_{id}_"))
    }

    /// Extracts the first `token` query parameter from `url`. Empty values
    /// count as absent.
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        url.query_pairs()
            .find(|(name, _)| name == TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Returns `url` without any `token` parameter, or `None` when there was
/// nothing to remove. Other parameters keep their order; the fragment is kept.
#[must_use]
pub fn strip_credential(url: &Url) -> Option<Url> {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if !pairs.iter().any(|(name, _)| name == TOKEN_PARAM) {
        return None;
    }

    let mut stripped = url.clone();
    let kept: Vec<&(String, String)> = pairs.iter().filter(|(name, _)| name != TOKEN_PARAM).collect();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(name, value)| (name.as_str(), value.as_str())));
    }
    Some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    #[test]
    fn test_first_token_wins() {
        let credential =
            Credential::from_url(&url("https://app.test/?token=a&token=b")).expect("credential");
        assert_eq!(credential.expose(), "a");
        assert!(Credential::from_url(&url("https://app.test/?token=")).is_none());
        assert!(Credential::from_url(&url("https://app.test/?tokens=x")).is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let credential = Credential::new("tok_42_abc");
        assert_eq!(format!("{credential:?}"), "Credential([REDACTED])");
    }

    #[test]
    fn test_identity_substring_rule() {
        let credential = Credential::new("tok_42_abc");
        assert!(credential.embeds_identity("42"));
        assert!(!credential.embeds_identity("4"));
        assert!(!credential.embeds_identity(""));
        assert!(Credential::new("x_142_y").embeds_identity("142"));
    }

    #[test]
    fn test_matches() {
        let credential = Credential::new("tok_1");
        assert!(credential.matches("tok_1"));
        assert!(!credential.matches("tok_2"));
        assert!(!credential.matches("tok_1 "));
    }

    #[test]
    fn test_strip_removes_every_token() {
        let stripped =
            strip_credential(&url("https://app.test/path?token=a&token=b")).expect("stripped");
        assert_eq!(stripped.as_str(), "https://app.test/path");
    }

    #[test]
    fn test_strip_preserves_other_params_and_fragment() {
        let stripped = strip_credential(&url("https://app.test/p?x=1&token=a&y=2#section"))
            .expect("stripped");
        assert_eq!(stripped.as_str(), "https://app.test/p?x=1&y=2#section");
    }

    #[test]
    fn test_strip_without_token_is_none() {
        assert!(strip_credential(&url("https://app.test/p?x=1")).is_none());
    }
}

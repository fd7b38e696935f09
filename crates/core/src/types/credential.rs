//! Bearer credential type.
//!
//! The library service issues an opaque access token on login. The client
//! stores it, presents it on every request, and never inspects it.

use secrecy::{ExposeSecret, SecretString};

/// Storage key under which the credential is persisted.
pub const CREDENTIAL_STORAGE_KEY: &str = "accessToken";

/// An opaque bearer token.
///
/// The token is held in a [`SecretString`] so it never shows up in `Debug`
/// output or logs.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw token string.
    ///
    /// Surrounding whitespace is removed so a token read back from a file
    /// with a trailing newline still matches what the server issued.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self(SecretString::from(token.trim().to_owned()))
    }

    /// Returns `true` if the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Expose the raw token for use in an `Authorization` header or storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Format the `Authorization` header value.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_trims_token() {
        let credential = Credential::new("abc.def.ghi\n");
        assert_eq!(credential.expose(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_header() {
        let credential = Credential::from("tok");
        assert_eq!(credential.bearer_header(), "Bearer tok");
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::from("super-secret-token");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_empty() {
        assert!(Credential::from("   ").is_empty());
        assert!(!Credential::from("x").is_empty());
    }
}

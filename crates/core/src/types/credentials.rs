//! API credentials.
//!
//! The secret is kept as opaque bytes for the lifetime of the process. Its
//! `Debug` and `Display` implementations never reveal the contents, so an
//! accidental `?credentials` in a log line prints `[REDACTED]`.

use std::fmt;

/// HMAC signing secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecret(Vec<u8>);

impl ApiSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Raw key bytes for the signer. Never log the result.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecret([REDACTED])")
    }
}

impl fmt::Display for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// API key plus signing secret, constructed once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: ApiSecret,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: ApiSecret::new(api_secret),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &self.api_secret)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = ApiSecret::new("super-secret-value");
        assert_eq!(format!("{:?}", secret), "ApiSecret([REDACTED])");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), b"super-secret-value");
    }

    #[test]
    fn test_credentials_debug_hides_both_values() {
        let creds = Credentials::new("my-key-123", "my-secret-456");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("my-key-123"));
        assert!(!debug.contains("my-secret-456"));
        assert!(debug.contains("REDACTED"));
    }
}

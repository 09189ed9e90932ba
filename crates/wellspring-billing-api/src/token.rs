//! Bearer credentials

use chrono::{DateTime, Utc};
use std::fmt;

/// An access token presented as `Authorization: Bearer ...`
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token has passed its expiry at `now`.
    /// Tokens without a known expiry are never considered expired locally.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

// Keep the secret out of logs
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry() {
        let now = Utc::now();
        let token = BearerToken::new("abc").with_expiry(now + Duration::seconds(30));

        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::seconds(30)));
        assert!(!BearerToken::new("abc").is_expired(now + Duration::days(365)));
    }

    #[test]
    fn debug_redacts_secret() {
        let token = BearerToken::new("super-secret");
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("super-secret"));
    }
}

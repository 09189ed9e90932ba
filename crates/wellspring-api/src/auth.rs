//! Token refresh payloads

use serde::{Deserialize, Serialize};
use wellspring_util::UserId;

/// Body of a refresh-token grant request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// User attached to a token grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
}

/// Tokens issued by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,

    /// Lifetime of `access_token` in seconds
    pub expires_in: i64,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub user: Option<AuthUser>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

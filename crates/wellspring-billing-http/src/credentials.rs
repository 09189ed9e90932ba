//! Bearer credential providers

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wellspring_api::{RefreshTokenRequest, TokenGrant};
use wellspring_billing_api::{BearerToken, BillingError, BillingResult, CredentialProvider};
use wellspring_config::AuthSettings;
use wellspring_util::UserId;

use crate::client::{build_client, post, send_json};

/// A credential that never changes and cannot be refreshed
pub struct StaticCredentials {
    token: Option<BearerToken>,
}

impl StaticCredentials {
    pub fn new(token: Option<BearerToken>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn current(&self) -> Option<BearerToken> {
        self.token.clone()
    }

    async fn refresh(&self) -> BillingResult<Option<BearerToken>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct AuthSession {
    access: BearerToken,
    refresh_token: String,
    user_id: Option<UserId>,
}

/// Credentials renewed through the auth provider's refresh-token grant.
///
/// Refreshes are serialized: refresh tokens are single-use, so two concurrent
/// refreshes with the same token would sign the user out.
pub struct RefreshingCredentials {
    client: Client,
    token_url: String,
    api_key: Option<String>,
    session: Mutex<Option<AuthSession>>,
}

impl RefreshingCredentials {
    pub fn new(
        auth: &AuthSettings,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> BillingResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            token_url: auth.token_url(),
            api_key,
            session: Mutex::new(None),
        })
    }

    /// Install a session from tokens obtained elsewhere (e.g. at sign-in).
    /// An empty access token forces a refresh on first use.
    pub async fn set_session(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let access_token = access_token.into();
        let expires_at = if access_token.is_empty() {
            Some(DateTime::<Utc>::MIN_UTC)
        } else {
            expires_at
        };

        let mut access = BearerToken::new(access_token);
        if let Some(at) = expires_at {
            access = access.with_expiry(at);
        }

        *self.session.lock().await = Some(AuthSession {
            access,
            refresh_token: refresh_token.into(),
            user_id: None,
        });
    }

    /// Install a session from a token grant
    pub async fn sign_in(&self, grant: TokenGrant) {
        let session = session_from_grant(grant, wellspring_util::now());
        info!(user_id = ?session.user_id, "Auth session established");
        *self.session.lock().await = Some(session);
    }

    pub async fn sign_out(&self) {
        if self.session.lock().await.take().is_some() {
            info!("Auth session cleared");
        }
    }

    /// User the current session belongs to, when the grant named one
    pub async fn user_id(&self) -> Option<UserId> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.user_id.clone())
    }

    async fn request_grant(&self, refresh_token: &str) -> BillingResult<TokenGrant> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let request = post(&self.client, &self.token_url, self.api_key.as_deref(), None).json(&body);
        send_json(request).await
    }
}

fn session_from_grant(grant: TokenGrant, now: DateTime<Utc>) -> AuthSession {
    let access = BearerToken::new(grant.access_token);
    let expires_at =
        Duration::try_seconds(grant.expires_in).and_then(|ttl| now.checked_add_signed(ttl));
    let access = match expires_at {
        Some(at) => access.with_expiry(at),
        None => {
            warn!(
                expires_in = grant.expires_in,
                "Token lifetime out of range, keeping it without expiry"
            );
            access
        }
    };

    AuthSession {
        access,
        refresh_token: grant.refresh_token,
        user_id: grant.user.map(|u| u.id),
    }
}

#[async_trait]
impl CredentialProvider for RefreshingCredentials {
    async fn current(&self) -> Option<BearerToken> {
        self.session.lock().await.as_ref().map(|s| s.access.clone())
    }

    async fn refresh(&self) -> BillingResult<Option<BearerToken>> {
        let mut session = self.session.lock().await;
        let Some(current) = session.as_ref() else {
            debug!("No session to refresh");
            return Ok(None);
        };

        match self.request_grant(&current.refresh_token).await {
            Ok(grant) => {
                let mut fresh = session_from_grant(grant, wellspring_util::now());
                if fresh.user_id.is_none() {
                    fresh.user_id = current.user_id.clone();
                }
                let token = fresh.access.clone();
                debug!(expires_at = ?token.expires_at(), "Access token refreshed");
                *session = Some(fresh);
                Ok(Some(token))
            }
            // The refresh token itself was rejected: the session is over
            Err(BillingError::Unauthorized(message))
            | Err(BillingError::Status {
                status: 400,
                message,
            }) => {
                warn!(error = %message, "Refresh token rejected, clearing session");
                *session = None;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(e)
            }
        }
    }
}

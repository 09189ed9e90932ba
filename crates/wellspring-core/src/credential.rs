//! Credential freshness

use wellspring_billing_api::{BearerToken, CredentialProvider};
use tracing::{debug, warn};

/// The current credential, refreshed first if it has expired locally.
///
/// Returns `None` when there is no credential or refreshing could not produce
/// one. Refresh failures are logged and otherwise swallowed.
pub async fn usable_credential(credentials: &dyn CredentialProvider) -> Option<BearerToken> {
    let token = credentials.current().await?;
    if !token.is_expired(wellspring_util::now()) {
        return Some(token);
    }

    debug!("Credential expired locally, refreshing");
    refreshed_credential(credentials).await
}

/// Ask the provider for a fresh credential
pub async fn refreshed_credential(credentials: &dyn CredentialProvider) -> Option<BearerToken> {
    match credentials.refresh().await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Credential refresh failed");
            None
        }
    }
}

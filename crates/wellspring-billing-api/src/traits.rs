//! Backend traits

use async_trait::async_trait;
use thiserror::Error;
use wellspring_api::{BillingStatus, CheckoutRequest, ComplianceKind, ComplianceRecord, RedirectUrl};
use wellspring_util::WellspringError;

use crate::BearerToken;

/// Errors from backend operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// The endpoint rejected the credential (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The operation needs a credential and none is available
    #[error("Not signed in")]
    AuthenticationMissing,

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BillingError::Unauthorized(_))
    }
}

impl From<BillingError> for WellspringError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::Unauthorized(msg) => WellspringError::stale(msg),
            BillingError::AuthenticationMissing => WellspringError::AuthenticationMissing,
            other => WellspringError::billing(other.to_string()),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

/// Billing endpoints: status, checkout session, customer portal
#[async_trait]
pub trait BillingBackend: Send + Sync {
    /// Current subscription state for the token's user
    async fn check_subscription(&self, token: &BearerToken) -> BillingResult<BillingStatus>;

    /// Start a checkout session. Guests may check out without a token.
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
        token: Option<&BearerToken>,
    ) -> BillingResult<RedirectUrl>;

    /// Open the customer's self-service billing portal
    async fn customer_portal(&self, token: &BearerToken) -> BillingResult<RedirectUrl>;
}

/// Source of bearer credentials for the signed-in user
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The credential as currently held, without network access
    async fn current(&self) -> Option<BearerToken>;

    /// Obtain a fresh credential. `Ok(None)` means the session is gone.
    async fn refresh(&self) -> BillingResult<Option<BearerToken>>;
}

/// Remote recording endpoints for audit, consent and waiver records
#[async_trait]
pub trait ComplianceSink: Send + Sync {
    async fn submit(
        &self,
        kind: ComplianceKind,
        record: &ComplianceRecord,
        token: &BearerToken,
    ) -> BillingResult<()>;
}

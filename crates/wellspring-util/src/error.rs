//! Error types for wellspring

use thiserror::Error;

/// Core error type for wellspring operations
#[derive(Debug, Error)]
pub enum WellspringError {
    #[error("Not signed in")]
    AuthenticationMissing,

    #[error("Credential rejected: {0}")]
    CredentialStale(String),

    #[error("Billing service error: {0}")]
    Billing(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WellspringError {
    pub fn stale(msg: impl Into<String>) -> Self {
        Self::CredentialStale(msg.into())
    }

    pub fn billing(msg: impl Into<String>) -> Self {
        Self::Billing(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WellspringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            WellspringError::billing("status 500").to_string(),
            "Billing service error: status 500"
        );
        assert_eq!(
            WellspringError::AuthenticationMissing.to_string(),
            "Not signed in"
        );
    }
}

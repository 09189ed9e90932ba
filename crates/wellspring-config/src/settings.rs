//! Validated settings

use crate::schema::{
    RawAuthConfig, RawBillingConfig, RawComplianceConfig, RawConfig, RawServiceConfig,
    RawSessionsConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use wellspring_api::ComplianceKind;

pub const DEFAULT_CHECK_SUBSCRIPTION_PATH: &str = "check-subscription";
pub const DEFAULT_CREATE_CHECKOUT_PATH: &str = "create-checkout";
pub const DEFAULT_CUSTOMER_PORTAL_PATH: &str = "customer-portal";
pub const DEFAULT_AUDIT_PATH: &str = "log-audit-event";
pub const DEFAULT_CONSENT_PATH: &str = "record-consent";
pub const DEFAULT_WAIVER_PATH: &str = "sign-waiver";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_JOIN_LEAD_MINUTES: i64 = 15;
pub const DEFAULT_SESSION_MINUTES: i64 = 60;
pub const MAX_JOIN_LEAD_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

/// Validated settings ready for use by the service
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub billing: BillingSettings,
    pub auth: Option<AuthSettings>,
    pub compliance: ComplianceSettings,
    pub sessions: SessionSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            billing: BillingSettings::from_raw(raw.billing),
            auth: raw.auth.map(AuthSettings::from_raw),
            compliance: ComplianceSettings::from_raw(raw.compliance),
            sessions: SessionSettings::from_raw(raw.sessions),
        }
    }

    /// Full URL of a compliance recording function
    pub fn compliance_url(&self, kind: ComplianceKind) -> String {
        join_url(&self.billing.base_url, self.compliance.path_for(kind))
    }
}

/// Local service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw
                .data_dir
                .unwrap_or_else(wellspring_util::default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: wellspring_util::default_data_dir(),
        }
    }
}

/// Billing function endpoints and cadence
#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub check_subscription_path: String,
    pub create_checkout_path: String,
    pub customer_portal_path: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl BillingSettings {
    fn from_raw(raw: RawBillingConfig) -> Self {
        Self {
            base_url: raw.base_url,
            api_key: raw.api_key,
            check_subscription_path: raw
                .check_subscription_path
                .unwrap_or_else(|| DEFAULT_CHECK_SUBSCRIPTION_PATH.into()),
            create_checkout_path: raw
                .create_checkout_path
                .unwrap_or_else(|| DEFAULT_CREATE_CHECKOUT_PATH.into()),
            customer_portal_path: raw
                .customer_portal_path
                .unwrap_or_else(|| DEFAULT_CUSTOMER_PORTAL_PATH.into()),
            request_timeout: Duration::from_secs(
                raw.request_timeout_seconds
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            poll_interval: Duration::from_secs(
                raw.poll_interval_seconds
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
        }
    }

    /// Settings pointing every function at `base_url` with default paths
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::from_raw(RawBillingConfig {
            base_url: base_url.into(),
            api_key: None,
            check_subscription_path: None,
            create_checkout_path: None,
            customer_portal_path: None,
            request_timeout_seconds: None,
            poll_interval_seconds: None,
        })
    }

    pub fn check_subscription_url(&self) -> String {
        join_url(&self.base_url, &self.check_subscription_path)
    }

    pub fn create_checkout_url(&self) -> String {
        join_url(&self.base_url, &self.create_checkout_path)
    }

    pub fn customer_portal_url(&self) -> String {
        join_url(&self.base_url, &self.customer_portal_path)
    }
}

/// Auth provider endpoints
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub url: String,
}

impl AuthSettings {
    fn from_raw(raw: RawAuthConfig) -> Self {
        Self { url: raw.url }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/token?grant_type=refresh_token",
            self.url.trim_end_matches('/')
        )
    }
}

/// Compliance function paths
#[derive(Debug, Clone)]
pub struct ComplianceSettings {
    pub audit_path: String,
    pub consent_path: String,
    pub waiver_path: String,
}

impl ComplianceSettings {
    fn from_raw(raw: RawComplianceConfig) -> Self {
        Self {
            audit_path: raw.audit_path.unwrap_or_else(|| DEFAULT_AUDIT_PATH.into()),
            consent_path: raw
                .consent_path
                .unwrap_or_else(|| DEFAULT_CONSENT_PATH.into()),
            waiver_path: raw.waiver_path.unwrap_or_else(|| DEFAULT_WAIVER_PATH.into()),
        }
    }

    pub fn path_for(&self, kind: ComplianceKind) -> &str {
        match kind {
            ComplianceKind::Audit => &self.audit_path,
            ComplianceKind::Consent => &self.consent_path,
            ComplianceKind::Waiver => &self.waiver_path,
        }
    }
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self::from_raw(RawComplianceConfig::default())
    }
}

/// Join-window defaults
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub join_lead_minutes: i64,
    pub default_duration_minutes: i64,
}

impl SessionSettings {
    fn from_raw(raw: RawSessionsConfig) -> Self {
        Self {
            join_lead_minutes: raw.join_lead_minutes.unwrap_or(DEFAULT_JOIN_LEAD_MINUTES),
            default_duration_minutes: raw
                .default_duration_minutes
                .unwrap_or(DEFAULT_SESSION_MINUTES),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_raw(RawSessionsConfig::default())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://a/b/", "/c"), "http://a/b/c");
        assert_eq!(join_url("http://a/b", "c"), "http://a/b/c");
    }

    #[test]
    fn compliance_paths_default() {
        let compliance = ComplianceSettings::default();
        assert_eq!(compliance.path_for(ComplianceKind::Audit), "log-audit-event");
        assert_eq!(compliance.path_for(ComplianceKind::Consent), "record-consent");
        assert_eq!(compliance.path_for(ComplianceKind::Waiver), "sign-waiver");
    }

    #[test]
    fn billing_with_base_url_uses_defaults() {
        let billing = BillingSettings::with_base_url("http://127.0.0.1:9999");
        assert_eq!(
            billing.create_checkout_url(),
            "http://127.0.0.1:9999/create-checkout"
        );
        assert_eq!(billing.request_timeout, Duration::from_secs(15));
    }
}

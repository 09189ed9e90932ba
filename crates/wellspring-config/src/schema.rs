//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Local service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Billing functions
    pub billing: RawBillingConfig,

    /// Auth provider, needed for token refresh
    #[serde(default)]
    pub auth: Option<RawAuthConfig>,

    /// Compliance recording functions
    #[serde(default)]
    pub compliance: RawComplianceConfig,

    /// Join-window defaults
    #[serde(default)]
    pub sessions: RawSessionsConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the local store
    pub data_dir: Option<PathBuf>,
}

/// Billing function endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawBillingConfig {
    /// Base URL the function paths are appended to
    pub base_url: String,

    /// Publishable API key sent as the `apikey` header
    pub api_key: Option<String>,

    pub check_subscription_path: Option<String>,
    pub create_checkout_path: Option<String>,
    pub customer_portal_path: Option<String>,

    /// Per-request timeout (default 15s)
    pub request_timeout_seconds: Option<u64>,

    /// Subscription re-poll interval (default 60s)
    pub poll_interval_seconds: Option<u64>,
}

/// Auth provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAuthConfig {
    /// Base URL of the auth API (e.g. `https://<project>.supabase.co/auth/v1`)
    pub url: String,
}

/// Compliance function paths, relative to `billing.base_url`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawComplianceConfig {
    pub audit_path: Option<String>,
    pub consent_path: Option<String>,
    pub waiver_path: Option<String>,
}

/// Join-window defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionsConfig {
    /// How long before the scheduled start joining opens
    pub join_lead_minutes: Option<i64>,

    /// Duration assumed when a booking doesn't carry one
    pub default_duration_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [service]
            data_dir = "/var/lib/wellspring"

            [billing]
            base_url = "https://demo.supabase.co/functions/v1"
            api_key = "anon"
            request_timeout_seconds = 10

            [compliance]
            waiver_path = "sign-liability-waiver"

            [sessions]
            join_lead_minutes = 10
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.billing.request_timeout_seconds, Some(10));
        assert_eq!(
            config.compliance.waiver_path.as_deref(),
            Some("sign-liability-waiver")
        );
        assert!(config.compliance.audit_path.is_none());
        assert_eq!(config.sessions.join_lead_minutes, Some(10));
        assert!(config.auth.is_none());
    }

    #[test]
    fn billing_section_is_required() {
        let result: Result<RawConfig, _> = toml::from_str("config_version = 1");
        assert!(result.is_err());
    }
}

//! Configuration validation

use crate::schema::{RawConfig, RawSessionsConfig};
use crate::settings::{MAX_JOIN_LEAD_MINUTES, MAX_SESSION_MINUTES};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not an http(s) URL")]
    InvalidUrl { field: String, value: String },

    #[error("{field} cannot be empty")]
    EmptyValue { field: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: String },

    #[error("{field} = {value}: {message}")]
    OutOfRange {
        field: String,
        value: i64,
        message: String,
    },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_url("billing.base_url", &config.billing.base_url));

    if let Some(key) = &config.billing.api_key
        && key.trim().is_empty()
    {
        errors.push(ValidationError::EmptyValue {
            field: "billing.api_key".into(),
        });
    }

    let paths = [
        ("billing.check_subscription_path", &config.billing.check_subscription_path),
        ("billing.create_checkout_path", &config.billing.create_checkout_path),
        ("billing.customer_portal_path", &config.billing.customer_portal_path),
        ("compliance.audit_path", &config.compliance.audit_path),
        ("compliance.consent_path", &config.compliance.consent_path),
        ("compliance.waiver_path", &config.compliance.waiver_path),
    ];
    for (field, path) in paths {
        if let Some(path) = path
            && path.trim_matches('/').trim().is_empty()
        {
            errors.push(ValidationError::EmptyValue {
                field: field.into(),
            });
        }
    }

    if config.billing.request_timeout_seconds == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "billing.request_timeout_seconds".into(),
        });
    }
    if config.billing.poll_interval_seconds == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "billing.poll_interval_seconds".into(),
        });
    }

    if let Some(auth) = &config.auth {
        errors.extend(validate_url("auth.url", &auth.url));
    }

    errors.extend(validate_sessions(&config.sessions));

    errors
}

fn validate_url(field: &str, value: &str) -> Option<ValidationError> {
    let trimmed = value.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));

    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => None,
        _ => Some(ValidationError::InvalidUrl {
            field: field.into(),
            value: value.into(),
        }),
    }
}

fn validate_sessions(sessions: &RawSessionsConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(lead) = sessions.join_lead_minutes
        && !(0..=MAX_JOIN_LEAD_MINUTES).contains(&lead)
    {
        errors.push(ValidationError::OutOfRange {
            field: "sessions.join_lead_minutes".into(),
            value: lead,
            message: format!("must be between 0 and {} minutes", MAX_JOIN_LEAD_MINUTES),
        });
    }

    if let Some(duration) = sessions.default_duration_minutes
        && !(1..=MAX_SESSION_MINUTES).contains(&duration)
    {
        errors.push(ValidationError::OutOfRange {
            field: "sessions.default_duration_minutes".into(),
            value: duration,
            message: format!("must be between 1 and {} minutes", MAX_SESSION_MINUTES),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawAuthConfig, RawBillingConfig};

    fn base_config() -> RawConfig {
        RawConfig {
            config_version: 1,
            service: Default::default(),
            billing: RawBillingConfig {
                base_url: "https://demo.supabase.co/functions/v1".into(),
                api_key: None,
                check_subscription_path: None,
                create_checkout_path: None,
                customer_portal_path: None,
                request_timeout_seconds: None,
                poll_interval_seconds: None,
            },
            auth: None,
            compliance: Default::default(),
            sessions: Default::default(),
        }
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        assert!(validate_config(&base_config()).is_empty());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("f", "https://x.example").is_none());
        assert!(validate_url("f", "http://localhost:54321/functions/v1").is_none());
        assert!(validate_url("f", "ftp://x.example").is_some());
        assert!(validate_url("f", "https://").is_some());
        assert!(validate_url("f", "").is_some());
    }

    #[test]
    fn test_empty_paths_rejected() {
        let mut config = base_config();
        config.billing.customer_portal_path = Some("/".into());
        config.compliance.consent_path = Some("".into());

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::EmptyValue { .. })));
    }

    #[test]
    fn test_session_ranges() {
        let mut config = base_config();
        config.sessions.join_lead_minutes = Some(-1);
        config.sessions.default_duration_minutes = Some(0);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("sessions.join_lead_minutes")));
    }

    #[test]
    fn test_session_upper_bounds() {
        let mut config = base_config();
        config.sessions.join_lead_minutes = Some(MAX_JOIN_LEAD_MINUTES + 1);
        config.sessions.default_duration_minutes = Some(1_000_000_000_000);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::OutOfRange { .. })));

        config.sessions.join_lead_minutes = Some(MAX_JOIN_LEAD_MINUTES);
        config.sessions.default_duration_minutes = Some(MAX_SESSION_MINUTES);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_auth_url_checked() {
        let mut config = base_config();
        config.auth = Some(RawAuthConfig {
            url: "localhost/auth".into(),
        });

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidUrl { field, .. }] if field == "auth.url"
        ));
    }
}

//! Billing endpoint payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription plan, also used as the checkout price type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Monthly,
    Annual,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Annual => "annual",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Plan::Monthly),
            "annual" => Ok(Plan::Annual),
            other => Err(format!("Unknown plan: {}", other)),
        }
    }
}

/// Response of the billing-status function.
///
/// Every field may be absent; absent fields mean "not subscribed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingStatus {
    #[serde(default)]
    pub subscribed: bool,

    #[serde(default)]
    pub plan: Option<Plan>,

    #[serde(default)]
    pub subscription_end: Option<DateTime<Utc>>,
}

/// Body of a checkout creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "priceType")]
    pub price_type: Plan,
}

/// A URL the embedding application should navigate to.
///
/// The core never opens these itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectUrl {
    pub url: String,
}

impl RedirectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RedirectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Error body returned by the backend functions on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn billing_status_full() {
        let json = r#"{"subscribed":true,"plan":"annual","subscription_end":"2026-01-31T00:00:00.000Z"}"#;
        let status: BillingStatus = serde_json::from_str(json).unwrap();

        assert!(status.subscribed);
        assert_eq!(status.plan, Some(Plan::Annual));
        assert_eq!(
            status.subscription_end,
            Some(Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn billing_status_absent_fields_default() {
        let status: BillingStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status, BillingStatus::default());

        let status: BillingStatus =
            serde_json::from_str(r#"{"subscribed":false,"plan":null,"subscription_end":null}"#)
                .unwrap();
        assert!(!status.subscribed);
        assert!(status.plan.is_none());
    }

    #[test]
    fn checkout_request_uses_camel_case_key() {
        let body = serde_json::to_value(CheckoutRequest {
            price_type: Plan::Monthly,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "priceType": "monthly" }));
    }

    #[test]
    fn plan_from_str() {
        assert_eq!("Annual".parse::<Plan>().unwrap(), Plan::Annual);
        assert!("weekly".parse::<Plan>().is_err());
    }
}

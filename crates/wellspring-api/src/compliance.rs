//! Audit, consent and waiver recording payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which recording endpoint a record is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceKind {
    Audit,
    Consent,
    Waiver,
}

impl ComplianceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceKind::Audit => "audit",
            ComplianceKind::Consent => "consent",
            ComplianceKind::Waiver => "waiver",
        }
    }
}

impl fmt::Display for ComplianceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compliance record as accepted by the recording endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    /// What happened (e.g. `consent_granted`, `waiver_signed`)
    pub action: String,

    /// Table the action concerns
    pub table_name: String,

    /// Affected row, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Free-form details
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ComplianceRecord {
    pub fn new(action: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            table_name: table_name.into(),
            record_id: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Consent granted or withdrawn for a given consent type and policy version
    pub fn consent(consent_type: &str, granted: bool, policy_version: &str) -> Self {
        let action = if granted {
            "consent_granted"
        } else {
            "consent_withdrawn"
        };
        Self::new(action, "consent_records").with_metadata(serde_json::json!({
            "consent_type": consent_type,
            "granted": granted,
            "policy_version": policy_version,
        }))
    }

    /// Liability waiver signed under a typed name
    pub fn waiver(waiver_version: &str, signed_name: &str) -> Self {
        Self::new("waiver_signed", "liability_waivers").with_metadata(serde_json::json!({
            "waiver_version": waiver_version,
            "signed_name": signed_name,
        }))
    }
}

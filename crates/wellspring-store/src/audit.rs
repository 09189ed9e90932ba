//! Audit event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wellspring_api::{ComplianceKind, Plan};
use wellspring_util::UserId;

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// A user identity became present
    SignedIn { user_id: UserId },

    /// The user identity was cleared
    SignedOut { user_id: UserId },

    /// Reconciliation produced a different subscription state
    SubscriptionChanged {
        user_id: UserId,
        subscribed: bool,
        plan: Option<Plan>,
        subscription_end: Option<DateTime<Utc>>,
    },

    /// Reconciliation failed against the billing endpoint
    SubscriptionCheckFailed { user_id: UserId, message: String },

    /// A checkout session was created
    CheckoutCreated {
        user_id: Option<UserId>,
        plan: Plan,
    },

    /// A customer portal session was created
    PortalOpened { user_id: UserId },

    /// A compliance record was submitted
    ComplianceRecorded {
        kind: ComplianceKind,
        action: String,
        table_name: String,
    },

    /// A compliance record could not be submitted
    ComplianceSubmitFailed {
        kind: ComplianceKind,
        action: String,
        message: String,
    },

    /// Welcome dialog shown for the first time
    WelcomeShown { user_id: UserId },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: wellspring_util::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_json_is_tagged() {
        let event = AuditEventType::CheckoutCreated {
            user_id: None,
            plan: Plan::Annual,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "checkout_created");
        assert_eq!(json["plan"], "annual");
    }
}

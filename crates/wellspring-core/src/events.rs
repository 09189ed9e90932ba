//! Core events emitted by the subscription monitor

use wellspring_util::UserId;

use crate::SubscriptionState;

/// Events emitted by the core
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A user identity became present
    SignedIn { user_id: UserId },

    /// The user identity was cleared
    SignedOut { user_id: UserId },

    /// Reconciliation changed the billing fields
    SubscriptionChanged {
        user_id: UserId,
        state: SubscriptionState,
    },

    /// Reconciliation failed; last known state retained
    ReconcileFailed { user_id: UserId, message: String },
}

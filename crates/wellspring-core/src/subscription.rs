//! Subscription state reconciliation
//!
//! The billing endpoint is the source of truth for whether a user is
//! subscribed. Each reconciliation asks it again and folds the answer into a
//! published [`SubscriptionState`]. Attempts are numbered when issued and
//! only the most recently issued attempt may change the published state, so
//! a slow response can never overwrite a newer one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wellspring_api::{BillingStatus, Plan};
use wellspring_billing_api::{BillingBackend, CredentialProvider};
use wellspring_util::UserId;

use crate::credential::{refreshed_credential, usable_credential};

/// Billing state as seen by the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
    pub plan: Option<Plan>,
    pub subscription_end: Option<DateTime<Utc>>,

    /// True only while a reconciliation is outstanding
    pub loading: bool,

    /// Message from the most recent failed attempt
    pub error: Option<String>,
}

impl SubscriptionState {
    /// Unsubscribed, not loading, no error
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Shape of a freshly established user session
    pub fn starting() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn from_status(status: BillingStatus) -> Self {
        Self {
            subscribed: status.subscribed,
            plan: status.plan,
            subscription_end: status.subscription_end,
            loading: false,
            error: None,
        }
    }

    /// Whether the billing fields (not loading/error) match
    pub fn same_billing(&self, other: &SubscriptionState) -> bool {
        self.subscribed == other.subscribed
            && self.plan == other.plan
            && self.subscription_end == other.subscription_end
    }
}

/// Result of one reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub sequence: u64,

    /// False when a newer attempt was issued before this one completed
    pub applied: bool,

    /// Published state after the attempt
    pub state: SubscriptionState,
}

/// Reconciles the published subscription state with the billing endpoint
pub struct SubscriptionReconciler {
    billing: Arc<dyn BillingBackend>,
    credentials: Arc<dyn CredentialProvider>,
    state_tx: watch::Sender<SubscriptionState>,
    issued: AtomicU64,
}

impl SubscriptionReconciler {
    pub fn new(billing: Arc<dyn BillingBackend>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let (state_tx, _) = watch::channel(SubscriptionState::signed_out());
        Self {
            billing,
            credentials,
            state_tx,
            issued: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubscriptionState> {
        self.state_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state_tx.borrow().loading
    }

    /// Sequence number of the most recently issued attempt
    pub fn last_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Reconcile and return the published state
    pub async fn reconcile(&self, identity: Option<&UserId>) -> SubscriptionState {
        self.reconcile_attempt(identity).await.state
    }

    /// Publish the starting shape for a newly signed-in user.
    /// Any in-flight attempt is fenced off.
    pub fn begin_session(&self) {
        let sequence = self.issue();
        self.apply(sequence, |state| *state = SubscriptionState::starting());
    }

    /// Publish the signed-out shape. Any in-flight attempt is fenced off.
    pub fn reset(&self) -> SubscriptionState {
        let sequence = self.issue();
        self.apply(sequence, |state| *state = SubscriptionState::signed_out());
        self.state()
    }

    /// Run one reconciliation attempt
    pub async fn reconcile_attempt(&self, identity: Option<&UserId>) -> ReconcileOutcome {
        let sequence = self.issue();

        let Some(user_id) = identity else {
            debug!(sequence, "No identity, publishing signed-out state");
            return self.finish(sequence, |state| *state = SubscriptionState::signed_out());
        };

        if self.credentials.current().await.is_none() {
            debug!(sequence, user_id = %user_id, "No credential, publishing signed-out state");
            return self.finish(sequence, |state| *state = SubscriptionState::signed_out());
        }

        self.apply(sequence, |state| {
            state.loading = true;
            state.error = None;
        });

        let Some(token) = usable_credential(self.credentials.as_ref()).await else {
            info!(sequence, user_id = %user_id, "No usable credential, skipping billing check");
            return self.finish(sequence, |state| state.loading = false);
        };

        let result = match self.billing.check_subscription(&token).await {
            Err(e) if e.is_unauthorized() => {
                info!(sequence, user_id = %user_id, "Credential rejected, refreshing once");
                match refreshed_credential(self.credentials.as_ref()).await {
                    Some(fresh) => self.billing.check_subscription(&fresh).await,
                    None => {
                        return self.finish(sequence, |state| state.loading = false);
                    }
                }
            }
            other => other,
        };

        match result {
            Ok(status) => {
                debug!(
                    sequence,
                    user_id = %user_id,
                    subscribed = status.subscribed,
                    "Subscription status received"
                );
                self.finish(sequence, |state| *state = SubscriptionState::from_status(status))
            }
            Err(e) => {
                warn!(sequence, user_id = %user_id, error = %e, "Subscription check failed");
                let message = e.to_string();
                self.finish(sequence, |state| {
                    state.loading = false;
                    state.error = Some(message);
                })
            }
        }
    }

    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `update` if `sequence` is still the latest issued attempt
    fn apply(&self, sequence: u64, update: impl FnOnce(&mut SubscriptionState)) -> bool {
        let mut applied = false;
        self.state_tx.send_if_modified(|state| {
            if self.issued.load(Ordering::SeqCst) != sequence {
                return false;
            }
            applied = true;
            let before = state.clone();
            update(state);
            *state != before
        });

        if !applied {
            debug!(
                sequence,
                latest = self.last_issued(),
                "Discarding result of superseded reconciliation"
            );
        }
        applied
    }

    fn finish(
        &self,
        sequence: u64,
        update: impl FnOnce(&mut SubscriptionState),
    ) -> ReconcileOutcome {
        let applied = self.apply(sequence, update);
        ReconcileOutcome {
            sequence,
            applied,
            state: self.state(),
        }
    }
}

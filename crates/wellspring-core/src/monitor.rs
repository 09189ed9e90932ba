//! Periodic subscription reconciliation
//!
//! Reconciles once when a user signs in, then every poll interval while the
//! user stays signed in. Ticks that arrive while an attempt is still loading
//! are skipped. Signing out resets the published state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use wellspring_util::UserId;

use crate::{CoreEvent, SubscriptionReconciler};

/// Drives a [`SubscriptionReconciler`] from an identity channel
pub struct SubscriptionMonitor {
    reconciler: Arc<SubscriptionReconciler>,
    identity_rx: watch::Receiver<Option<UserId>>,
    shutdown_rx: watch::Receiver<bool>,
    poll_interval: Duration,
    event_tx: mpsc::Sender<CoreEvent>,
    in_flight: Option<JoinHandle<()>>,
}

impl SubscriptionMonitor {
    pub fn new(
        reconciler: Arc<SubscriptionReconciler>,
        identity_rx: watch::Receiver<Option<UserId>>,
        poll_interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, mpsc::Receiver<CoreEvent>) {
        let (event_tx, event_rx) = mpsc::channel(32);

        let monitor = Self {
            reconciler,
            identity_rx,
            shutdown_rx,
            poll_interval,
            event_tx,
            in_flight: None,
        };

        (monitor, event_rx)
    }

    /// Run until shutdown is signalled or the identity channel closes
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        interval.tick().await;

        let mut identity: Option<UserId> = None;
        let initial = self.identity_rx.borrow_and_update().clone();
        self.transition(&mut identity, initial).await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(user_id) = identity.clone() else {
                        continue;
                    };
                    if self.reconciler.is_loading() {
                        debug!(user_id = %user_id, "Previous reconciliation still loading, skipping tick");
                        continue;
                    }
                    self.spawn_reconcile(user_id);
                }
                changed = self.identity_rx.changed() => {
                    if changed.is_err() {
                        debug!("Identity channel closed");
                        break;
                    }
                    let next = self.identity_rx.borrow_and_update().clone();
                    if self.transition(&mut identity, next).await {
                        interval.reset();
                    }
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        debug!("Subscription monitor shutting down");
                        break;
                    }
                }
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        info!("Subscription monitor stopped");
    }

    /// Handle an identity change. Returns true if the identity changed.
    async fn transition(&mut self, identity: &mut Option<UserId>, next: Option<UserId>) -> bool {
        if *identity == next {
            return false;
        }

        if let Some(previous) = identity.take() {
            self.cancel_in_flight();
            self.reconciler.reset();
            info!(user_id = %previous, "Signed out, subscription state reset");
            let _ = self
                .event_tx
                .send(CoreEvent::SignedOut { user_id: previous })
                .await;
        }

        if let Some(user_id) = next {
            info!(user_id = %user_id, "Signed in, reconciling subscription");
            let _ = self
                .event_tx
                .send(CoreEvent::SignedIn {
                    user_id: user_id.clone(),
                })
                .await;
            self.reconciler.begin_session();
            self.spawn_reconcile(user_id.clone());
            *identity = Some(user_id);
        }

        true
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    fn spawn_reconcile(&mut self, user_id: UserId) {
        let reconciler = self.reconciler.clone();
        let event_tx = self.event_tx.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let before = reconciler.state();
            let outcome = reconciler.reconcile_attempt(Some(&user_id)).await;
            if !outcome.applied {
                return;
            }

            if let Some(message) = outcome.state.error.clone() {
                let _ = event_tx
                    .send(CoreEvent::ReconcileFailed { user_id, message })
                    .await;
            } else if !outcome.state.same_billing(&before) {
                let _ = event_tx
                    .send(CoreEvent::SubscriptionChanged {
                        user_id,
                        state: outcome.state,
                    })
                    .await;
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubscriptionState;
    use wellspring_api::Plan;
    use wellspring_billing_api::{MockBilling, MockCredentials, ScriptedStatus};

    struct Harness {
        billing: Arc<MockBilling>,
        reconciler: Arc<SubscriptionReconciler>,
        identity_tx: watch::Sender<Option<UserId>>,
        shutdown_tx: watch::Sender<bool>,
        events: mpsc::Receiver<CoreEvent>,
        task: JoinHandle<()>,
    }

    fn start(billing: MockBilling, poll: Duration, identity: Option<UserId>) -> Harness {
        let billing = Arc::new(billing);
        let creds = Arc::new(MockCredentials::with_token("t"));
        let reconciler = Arc::new(SubscriptionReconciler::new(billing.clone(), creds));
        let (identity_tx, identity_rx) = watch::channel(identity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (monitor, events) =
            SubscriptionMonitor::new(reconciler.clone(), identity_rx, poll, shutdown_rx);
        let task = tokio::spawn(monitor.run());

        Harness {
            billing,
            reconciler,
            identity_tx,
            shutdown_tx,
            events,
            task,
        }
    }

    async fn next_event(events: &mut mpsc::Receiver<CoreEvent>) -> CoreEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn sign_in_reconciles_once_immediately() {
        let mut h = start(
            MockBilling::subscribed(Plan::Monthly),
            Duration::from_secs(3600),
            None,
        );

        h.identity_tx.send(Some(UserId::new("u1"))).unwrap();

        assert_eq!(
            next_event(&mut h.events).await,
            CoreEvent::SignedIn {
                user_id: UserId::new("u1")
            }
        );
        match next_event(&mut h.events).await {
            CoreEvent::SubscriptionChanged { user_id, state } => {
                assert_eq!(user_id.as_str(), "u1");
                assert!(state.subscribed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(h.billing.status_calls(), 1);

        h.shutdown_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn polls_while_signed_in() {
        let h = start(
            MockBilling::new(),
            Duration::from_millis(50),
            Some(UserId::new("u1")),
        );

        tokio::time::sleep(Duration::from_millis(280)).await;
        assert!(h.billing.status_calls() >= 3);

        h.shutdown_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn loading_gate_skips_ticks() {
        let billing = MockBilling::new();
        billing.push_status(
            Duration::from_millis(400),
            ScriptedStatus::Ok(Default::default()),
        );
        let h = start(billing, Duration::from_millis(50), Some(UserId::new("u1")));

        tokio::time::sleep(Duration::from_millis(250)).await;
        // Only the sign-in attempt, still loading
        assert_eq!(h.billing.status_calls(), 1);
        assert!(h.reconciler.is_loading());

        h.shutdown_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn sign_out_resets_state() {
        let mut h = start(
            MockBilling::subscribed(Plan::Annual),
            Duration::from_secs(3600),
            Some(UserId::new("u1")),
        );

        next_event(&mut h.events).await; // SignedIn
        next_event(&mut h.events).await; // SubscriptionChanged
        assert!(h.reconciler.state().subscribed);

        h.identity_tx.send(None).unwrap();
        assert_eq!(
            next_event(&mut h.events).await,
            CoreEvent::SignedOut {
                user_id: UserId::new("u1")
            }
        );
        assert_eq!(h.reconciler.state(), SubscriptionState::signed_out());

        h.shutdown_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let billing = MockBilling::new();
        billing.set_fail_status(true);
        let mut h = start(billing, Duration::from_secs(3600), Some(UserId::new("u1")));

        next_event(&mut h.events).await; // SignedIn
        match next_event(&mut h.events).await {
            CoreEvent::ReconcileFailed { message, .. } => {
                assert!(message.contains("Mock status failure"))
            }
            other => panic!("unexpected event: {other:?}"),
        }

        h.shutdown_tx.send(true).unwrap();
        h.task.await.unwrap();
    }
}

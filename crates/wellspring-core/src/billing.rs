//! Checkout and customer portal

use std::sync::Arc;
use tracing::{info, warn};
use wellspring_api::{CheckoutRequest, Plan, RedirectUrl};
use wellspring_billing_api::{BillingBackend, BillingError, CredentialProvider};
use wellspring_store::{AuditEvent, AuditEventType, Store};
use wellspring_util::{Result, UserId};

use crate::credential::usable_credential;

/// One-shot billing actions that hand back a URL for the caller to open
pub struct BillingActions {
    billing: Arc<dyn BillingBackend>,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn Store>,
}

impl BillingActions {
    pub fn new(
        billing: Arc<dyn BillingBackend>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            billing,
            credentials,
            store,
        }
    }

    /// Start a checkout for `plan`. Works for guests; the bearer credential
    /// is attached when one is available.
    pub async fn create_checkout(&self, plan: Plan, user_id: Option<&UserId>) -> Result<RedirectUrl> {
        let token = usable_credential(self.credentials.as_ref()).await;
        let request = CheckoutRequest { price_type: plan };

        let url = self
            .billing
            .create_checkout(&request, token.as_ref())
            .await
            .inspect_err(|e| warn!(plan = %plan, error = %e, "Checkout creation failed"))?;

        info!(plan = %plan, guest = token.is_none(), "Checkout session created");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::CheckoutCreated {
            user_id: user_id.cloned(),
            plan,
        }));

        Ok(url)
    }

    /// Open the customer portal. Requires a credential.
    pub async fn open_customer_portal(&self, user_id: &UserId) -> Result<RedirectUrl> {
        let token = usable_credential(self.credentials.as_ref())
            .await
            .ok_or(BillingError::AuthenticationMissing)?;

        let url = self
            .billing
            .customer_portal(&token)
            .await
            .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Customer portal failed"))?;

        info!(user_id = %user_id, "Customer portal session created");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PortalOpened {
            user_id: user_id.clone(),
        }));

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellspring_billing_api::{MockBilling, MockCredentials};
    use wellspring_store::SqliteStore;
    use wellspring_util::WellspringError;

    fn actions(
        billing: &Arc<MockBilling>,
        creds: MockCredentials,
    ) -> (BillingActions, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let actions = BillingActions::new(billing.clone(), Arc::new(creds), store.clone());
        (actions, store)
    }

    #[tokio::test]
    async fn guest_checkout_without_credential() {
        let billing = Arc::new(MockBilling::new());
        let (actions, store) = actions(&billing, MockCredentials::signed_out());

        let url = actions.create_checkout(Plan::Monthly, None).await.unwrap();

        assert_eq!(url.as_str(), billing.checkout_url);
        let calls = billing.checkouts();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].plan, Plan::Monthly);
        assert_eq!(calls[0].bearer, None);

        let audits = store.get_recent_audits(1).unwrap();
        assert!(matches!(
            audits[0].event,
            AuditEventType::CheckoutCreated { user_id: None, plan: Plan::Monthly }
        ));
    }

    #[tokio::test]
    async fn checkout_attaches_bearer_when_signed_in() {
        let billing = Arc::new(MockBilling::new());
        let (actions, _) = actions(&billing, MockCredentials::with_token("tok"));

        actions
            .create_checkout(Plan::Annual, Some(&UserId::new("u1")))
            .await
            .unwrap();

        assert_eq!(billing.checkouts()[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn checkout_failure_propagates() {
        let billing = Arc::new(MockBilling::new());
        *billing.fail_checkout.lock().unwrap() = true;
        let (actions, store) = actions(&billing, MockCredentials::signed_out());

        let err = actions.create_checkout(Plan::Monthly, None).await.unwrap_err();

        assert!(matches!(err, WellspringError::Billing(_)));
        assert!(store.get_recent_audits(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn portal_requires_credential() {
        let billing = Arc::new(MockBilling::new());
        let (actions, _) = actions(&billing, MockCredentials::signed_out());

        let err = actions
            .open_customer_portal(&UserId::new("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WellspringError::AuthenticationMissing));
        assert_eq!(billing.portal_calls(), 0);
    }

    #[tokio::test]
    async fn portal_returns_url_for_caller() {
        let billing = Arc::new(MockBilling::new());
        let (actions, store) = actions(&billing, MockCredentials::with_token("tok"));

        let url = actions
            .open_customer_portal(&UserId::new("u1"))
            .await
            .unwrap();

        assert_eq!(url.as_str(), billing.portal_url);
        assert!(matches!(
            store.get_recent_audits(1).unwrap()[0].event,
            AuditEventType::PortalOpened { .. }
        ));
    }
}

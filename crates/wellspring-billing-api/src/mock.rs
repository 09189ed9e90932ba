//! Mock backends for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use wellspring_api::{
    BillingStatus, CheckoutRequest, ComplianceKind, ComplianceRecord, Plan, RedirectUrl,
};

use crate::{BearerToken, BillingBackend, BillingError, BillingResult, ComplianceSink, CredentialProvider};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Outcome of one scripted status call
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    Ok(BillingStatus),
    Fail(String),
    Unauthorized,
}

/// A checkout call as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCall {
    pub plan: Plan,
    pub bearer: Option<String>,
}

/// Mock billing backend
///
/// Status calls consume the script first (each entry with its own delay),
/// then fall back to `status` / `fail_status`.
pub struct MockBilling {
    script: Mutex<VecDeque<(Duration, ScriptedStatus)>>,
    status_calls: AtomicU64,
    portal_calls: AtomicU64,
    bearers: Mutex<Vec<String>>,
    checkouts: Mutex<Vec<CheckoutCall>>,

    /// Response when nothing is scripted
    pub status: Arc<Mutex<BillingStatus>>,

    /// Configure unscripted status calls to fail
    pub fail_status: Arc<Mutex<bool>>,

    /// Tokens answered with 401
    pub rejected_tokens: Arc<Mutex<Vec<String>>>,

    /// Configure checkout to fail
    pub fail_checkout: Arc<Mutex<bool>>,

    /// Configure portal to fail
    pub fail_portal: Arc<Mutex<bool>>,

    pub checkout_url: String,
    pub portal_url: String,
}

impl MockBilling {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            status_calls: AtomicU64::new(0),
            portal_calls: AtomicU64::new(0),
            bearers: Mutex::new(Vec::new()),
            checkouts: Mutex::new(Vec::new()),
            status: Arc::new(Mutex::new(BillingStatus::default())),
            fail_status: Arc::new(Mutex::new(false)),
            rejected_tokens: Arc::new(Mutex::new(Vec::new())),
            fail_checkout: Arc::new(Mutex::new(false)),
            fail_portal: Arc::new(Mutex::new(false)),
            checkout_url: "https://checkout.example.com/c/pay/cs_test".into(),
            portal_url: "https://billing.example.com/p/session/test".into(),
        }
    }

    /// Answer unscripted status calls with a subscribed state
    pub fn subscribed(plan: Plan) -> Self {
        let mock = Self::new();
        mock.set_status(BillingStatus {
            subscribed: true,
            plan: Some(plan),
            subscription_end: None,
        });
        mock
    }

    pub fn set_status(&self, status: BillingStatus) {
        *lock(&self.status) = status;
    }

    pub fn set_fail_status(&self, fail: bool) {
        *lock(&self.fail_status) = fail;
    }

    pub fn reject_token(&self, token: impl Into<String>) {
        lock(&self.rejected_tokens).push(token.into());
    }

    /// Queue the outcome of the next status call
    pub fn push_status(&self, delay: Duration, outcome: ScriptedStatus) {
        lock(&self.script).push_back((delay, outcome));
    }

    pub fn status_calls(&self) -> u64 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn portal_calls(&self) -> u64 {
        self.portal_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens presented to the status endpoint, in order
    pub fn status_bearers(&self) -> Vec<String> {
        lock(&self.bearers).clone()
    }

    pub fn checkouts(&self) -> Vec<CheckoutCall> {
        lock(&self.checkouts).clone()
    }
}

impl Default for MockBilling {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingBackend for MockBilling {
    async fn check_subscription(&self, token: &BearerToken) -> BillingResult<BillingStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.bearers).push(token.access_token().to_string());

        if lock(&self.rejected_tokens)
            .iter()
            .any(|t| t == token.access_token())
        {
            return Err(BillingError::Unauthorized("Mock token rejected".into()));
        }

        let scripted = lock(&self.script).pop_front();
        if let Some((delay, outcome)) = scripted {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return match outcome {
                ScriptedStatus::Ok(status) => Ok(status),
                ScriptedStatus::Fail(message) => Err(BillingError::Status {
                    status: 500,
                    message,
                }),
                ScriptedStatus::Unauthorized => {
                    Err(BillingError::Unauthorized("Mock token rejected".into()))
                }
            };
        }

        if *lock(&self.fail_status) {
            return Err(BillingError::Transport("Mock status failure".into()));
        }

        Ok(lock(&self.status).clone())
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
        token: Option<&BearerToken>,
    ) -> BillingResult<RedirectUrl> {
        lock(&self.checkouts).push(CheckoutCall {
            plan: request.price_type,
            bearer: token.map(|t| t.access_token().to_string()),
        });

        if *lock(&self.fail_checkout) {
            return Err(BillingError::Status {
                status: 500,
                message: "Mock checkout failure".into(),
            });
        }

        Ok(RedirectUrl {
            url: self.checkout_url.clone(),
        })
    }

    async fn customer_portal(&self, _token: &BearerToken) -> BillingResult<RedirectUrl> {
        self.portal_calls.fetch_add(1, Ordering::SeqCst);

        if *lock(&self.fail_portal) {
            return Err(BillingError::Status {
                status: 500,
                message: "Mock portal failure".into(),
            });
        }

        Ok(RedirectUrl {
            url: self.portal_url.clone(),
        })
    }
}

/// Mock credential provider
pub struct MockCredentials {
    current: Mutex<Option<BearerToken>>,
    refresh_calls: AtomicU64,

    /// What the next refresh yields
    pub refreshed: Arc<Mutex<Option<BearerToken>>>,

    /// Configure refresh to fail
    pub fail_refresh: Arc<Mutex<bool>>,
}

impl MockCredentials {
    pub fn new(current: Option<BearerToken>) -> Self {
        Self {
            current: Mutex::new(current),
            refresh_calls: AtomicU64::new(0),
            refreshed: Arc::new(Mutex::new(None)),
            fail_refresh: Arc::new(Mutex::new(false)),
        }
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Some(BearerToken::new(token)))
    }

    pub fn set_current(&self, token: Option<BearerToken>) {
        *lock(&self.current) = token;
    }

    pub fn set_refreshed(&self, token: Option<BearerToken>) {
        *lock(&self.refreshed) = token;
    }

    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    async fn current(&self) -> Option<BearerToken> {
        lock(&self.current).clone()
    }

    async fn refresh(&self) -> BillingResult<Option<BearerToken>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if *lock(&self.fail_refresh) {
            return Err(BillingError::Transport("Mock refresh failure".into()));
        }

        let fresh = lock(&self.refreshed).clone();
        *lock(&self.current) = fresh.clone();
        Ok(fresh)
    }
}

/// A record received by the mock sink
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedRecord {
    pub kind: ComplianceKind,
    pub record: ComplianceRecord,
    pub bearer: String,
}

/// Mock compliance sink
pub struct MockComplianceSink {
    submitted: Mutex<Vec<SubmittedRecord>>,

    /// Configure submit to fail
    pub fail_submit: Arc<Mutex<bool>>,
}

impl MockComplianceSink {
    pub fn new() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail_submit: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_fail_submit(&self, fail: bool) {
        *lock(&self.fail_submit) = fail;
    }

    pub fn submitted(&self) -> Vec<SubmittedRecord> {
        lock(&self.submitted).clone()
    }
}

impl Default for MockComplianceSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComplianceSink for MockComplianceSink {
    async fn submit(
        &self,
        kind: ComplianceKind,
        record: &ComplianceRecord,
        token: &BearerToken,
    ) -> BillingResult<()> {
        if *lock(&self.fail_submit) {
            return Err(BillingError::Transport("Mock submit failure".into()));
        }

        lock(&self.submitted).push(SubmittedRecord {
            kind,
            record: record.clone(),
            bearer: token.access_token().to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_status_script_then_fallback() {
        let billing = MockBilling::subscribed(Plan::Annual);
        billing.push_status(Duration::ZERO, ScriptedStatus::Fail("down".into()));

        let token = BearerToken::new("t1");
        assert!(billing.check_subscription(&token).await.is_err());

        let status = billing.check_subscription(&token).await.unwrap();
        assert!(status.subscribed);
        assert_eq!(status.plan, Some(Plan::Annual));
        assert_eq!(billing.status_calls(), 2);
        assert_eq!(billing.status_bearers(), vec!["t1", "t1"]);
    }

    #[tokio::test]
    async fn mock_rejects_configured_token() {
        let billing = MockBilling::new();
        billing.reject_token("old");

        let err = billing
            .check_subscription(&BearerToken::new("old"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(billing.check_subscription(&BearerToken::new("new")).await.is_ok());
    }

    #[tokio::test]
    async fn mock_refresh_replaces_current() {
        let creds = MockCredentials::with_token("old");
        creds.set_refreshed(Some(BearerToken::new("new")));

        let fresh = creds.refresh().await.unwrap().unwrap();
        assert_eq!(fresh.access_token(), "new");
        assert_eq!(creds.current().await.unwrap().access_token(), "new");
        assert_eq!(creds.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn mock_sink_records_and_fails() {
        let sink = MockComplianceSink::new();
        let token = BearerToken::new("t");
        let record = ComplianceRecord::waiver("v1", "Ana Lima");

        sink.submit(ComplianceKind::Waiver, &record, &token).await.unwrap();
        sink.set_fail_submit(true);
        assert!(sink.submit(ComplianceKind::Waiver, &record, &token).await.is_err());

        let submitted = sink.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].kind, ComplianceKind::Waiver);
        assert_eq!(submitted[0].bearer, "t");
    }
}

//! Audit, consent and waiver recording
//!
//! Records are mirrored into the local store right away, then submitted to
//! the remote recording function in the background. Submission is attempted
//! once; failures are logged and never surface to the caller.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wellspring_api::{ComplianceKind, ComplianceRecord};
use wellspring_billing_api::{ComplianceSink, CredentialProvider};
use wellspring_store::{AuditEvent, AuditEventType, ComplianceEntry, Store};
use wellspring_util::UserId;

use crate::credential::usable_credential;

pub struct ComplianceRecorder {
    sink: Arc<dyn ComplianceSink>,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn Store>,
}

impl ComplianceRecorder {
    pub fn new(
        sink: Arc<dyn ComplianceSink>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            sink,
            credentials,
            store,
        }
    }

    /// Record consent granted or withdrawn
    pub fn consent(
        &self,
        user_id: &UserId,
        consent_type: &str,
        granted: bool,
        policy_version: &str,
    ) -> JoinHandle<()> {
        self.record(
            user_id,
            ComplianceKind::Consent,
            ComplianceRecord::consent(consent_type, granted, policy_version),
        )
    }

    /// Record a signed liability waiver
    pub fn waiver(&self, user_id: &UserId, waiver_version: &str, signed_name: &str) -> JoinHandle<()> {
        self.record(
            user_id,
            ComplianceKind::Waiver,
            ComplianceRecord::waiver(waiver_version, signed_name),
        )
    }

    /// Record an arbitrary audit action
    pub fn audit(&self, user_id: &UserId, record: ComplianceRecord) -> JoinHandle<()> {
        self.record(user_id, ComplianceKind::Audit, record)
    }

    /// Mirror `record` locally and submit it in the background.
    ///
    /// The returned handle may be awaited or dropped; dropping it does not
    /// cancel the submission. Must be called from within a tokio runtime.
    pub fn record(
        &self,
        user_id: &UserId,
        kind: ComplianceKind,
        record: ComplianceRecord,
    ) -> JoinHandle<()> {
        let entry = ComplianceEntry::new(user_id.clone(), kind, record);
        if let Err(e) = self.store.save_compliance(&entry) {
            warn!(kind = %kind, error = %e, "Failed to mirror compliance record locally");
        }

        let sink = self.sink.clone();
        let credentials = self.credentials.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            let record = entry.record;

            let Some(token) = usable_credential(credentials.as_ref()).await else {
                warn!(kind = %kind, action = %record.action, "No credential, compliance record not submitted");
                let _ = store.append_audit(AuditEvent::new(AuditEventType::ComplianceSubmitFailed {
                    kind,
                    action: record.action.clone(),
                    message: "not signed in".into(),
                }));
                return;
            };

            match sink.submit(kind, &record, &token).await {
                Ok(()) => {
                    debug!(kind = %kind, action = %record.action, "Compliance record submitted");
                    let _ = store.append_audit(AuditEvent::new(AuditEventType::ComplianceRecorded {
                        kind,
                        action: record.action,
                        table_name: record.table_name,
                    }));
                }
                Err(e) => {
                    warn!(kind = %kind, action = %record.action, error = %e, "Compliance record submission failed");
                    let _ = store.append_audit(AuditEvent::new(
                        AuditEventType::ComplianceSubmitFailed {
                            kind,
                            action: record.action,
                            message: e.to_string(),
                        },
                    ));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellspring_billing_api::{MockComplianceSink, MockCredentials};
    use wellspring_store::SqliteStore;

    struct Fixture {
        sink: Arc<MockComplianceSink>,
        store: Arc<SqliteStore>,
        recorder: ComplianceRecorder,
    }

    fn fixture(creds: MockCredentials) -> Fixture {
        let sink = Arc::new(MockComplianceSink::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let recorder = ComplianceRecorder::new(sink.clone(), Arc::new(creds), store.clone());
        Fixture {
            sink,
            store,
            recorder,
        }
    }

    #[tokio::test]
    async fn consent_is_mirrored_and_submitted() {
        let f = fixture(MockCredentials::with_token("tok"));
        let user = UserId::new("u1");

        f.recorder
            .consent(&user, "health_data", true, "2025-01")
            .await
            .unwrap();

        let submitted = f.sink.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].kind, ComplianceKind::Consent);
        assert_eq!(submitted[0].record.action, "consent_granted");
        assert_eq!(submitted[0].bearer, "tok");

        let mirrored = f.store.list_compliance(&user, ComplianceKind::Consent).unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].record, submitted[0].record);

        assert!(matches!(
            f.store.get_recent_audits(1).unwrap()[0].event,
            AuditEventType::ComplianceRecorded { kind: ComplianceKind::Consent, .. }
        ));
    }

    #[tokio::test]
    async fn submission_failure_is_swallowed() {
        let f = fixture(MockCredentials::with_token("tok"));
        f.sink.set_fail_submit(true);
        let user = UserId::new("u1");

        // Completes normally even though the remote call failed
        f.recorder.waiver(&user, "v2", "Ana Lima").await.unwrap();

        assert!(f.sink.submitted().is_empty());
        assert_eq!(
            f.store.list_compliance(&user, ComplianceKind::Waiver).unwrap().len(),
            1
        );
        assert!(matches!(
            f.store.get_recent_audits(1).unwrap()[0].event,
            AuditEventType::ComplianceSubmitFailed { kind: ComplianceKind::Waiver, .. }
        ));
    }

    #[tokio::test]
    async fn without_credential_nothing_is_sent() {
        let f = fixture(MockCredentials::signed_out());
        let user = UserId::new("u1");

        f.recorder
            .audit(&user, ComplianceRecord::new("profile_updated", "profiles"))
            .await
            .unwrap();

        assert!(f.sink.submitted().is_empty());
        assert_eq!(
            f.store.list_compliance(&user, ComplianceKind::Audit).unwrap().len(),
            1
        );
    }
}

//! Store trait definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wellspring_api::{ComplianceKind, ComplianceRecord};
use wellspring_util::{RecordId, UserId};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Compliance mirror

    /// Keep a local copy of a compliance record sent to the backend
    fn save_compliance(&self, entry: &ComplianceEntry) -> StoreResult<()>;

    /// Compliance records of one kind for a user, oldest first
    fn list_compliance(
        &self,
        user_id: &UserId,
        kind: ComplianceKind,
    ) -> StoreResult<Vec<ComplianceEntry>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Small string-keyed state that outlives a process
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// A compliance record as mirrored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    pub id: RecordId,
    pub user_id: UserId,
    pub kind: ComplianceKind,
    pub record: ComplianceRecord,
    pub recorded_at: DateTime<Utc>,
}

impl ComplianceEntry {
    pub fn new(user_id: UserId, kind: ComplianceKind, record: ComplianceRecord) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            kind,
            record,
            recorded_at: wellspring_util::now(),
        }
    }
}

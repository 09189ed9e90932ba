//! First-run welcome dialog tracking

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use wellspring_store::KeyValueStore;
use wellspring_util::{Result, UserId, WellspringError};

/// Key under which the seen user ids are stored, as a JSON array
pub const WELCOME_SEEN_KEY: &str = "welcome.seen_users";

/// Remembers which users have already seen the welcome dialog
pub struct WelcomeGate {
    kv: Arc<dyn KeyValueStore>,
}

impl WelcomeGate {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Whether the dialog should be shown to `user_id`
    pub fn should_show(&self, user_id: &UserId) -> Result<bool> {
        Ok(!self.seen_users()?.contains(user_id))
    }

    /// Mark the dialog as seen. Returns true the first time for a user.
    pub fn mark_seen(&self, user_id: &UserId) -> Result<bool> {
        let mut seen = self.seen_users()?;
        if !seen.insert(user_id.clone()) {
            return Ok(false);
        }

        let json = serde_json::to_string(&seen)
            .map_err(|e| WellspringError::internal(format!("encode seen users: {}", e)))?;
        self.kv.set(WELCOME_SEEN_KEY, &json)?;

        debug!(user_id = %user_id, "Welcome dialog marked as seen");
        Ok(true)
    }

    fn seen_users(&self) -> Result<BTreeSet<UserId>> {
        match self.kv.get(WELCOME_SEEN_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                WellspringError::store(format!("corrupt value under {}: {}", WELCOME_SEEN_KEY, e))
            }),
            None => Ok(BTreeSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellspring_store::{MemoryKeyValueStore, SqliteStore};

    #[test]
    fn first_visit_shows_once() {
        let gate = WelcomeGate::new(Arc::new(MemoryKeyValueStore::new()));
        let user = UserId::new("u1");

        assert!(gate.should_show(&user).unwrap());
        assert!(gate.mark_seen(&user).unwrap());
        assert!(!gate.should_show(&user).unwrap());
        assert!(!gate.mark_seen(&user).unwrap());

        assert!(gate.should_show(&UserId::new("u2")).unwrap());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let user = UserId::new("u1");

        {
            let gate = WelcomeGate::new(Arc::new(SqliteStore::open(&path).unwrap()));
            gate.mark_seen(&user).unwrap();
        }

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        assert_eq!(
            store.get(WELCOME_SEEN_KEY).unwrap().as_deref(),
            Some("[\"u1\"]")
        );
        let gate = WelcomeGate::new(store);
        assert!(!gate.should_show(&user).unwrap());
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(WELCOME_SEEN_KEY, "not json").unwrap();
        let gate = WelcomeGate::new(kv);

        assert!(gate.should_show(&UserId::new("u1")).is_err());
    }
}

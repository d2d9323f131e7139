//! Configuration change detection
//!
//! Compares the fingerprint of the last successfully applied configuration
//! with a freshly rendered one. The applied fingerprint is only ever written
//! after the sink (and any restart) succeeded.

use std::sync::Arc;

use cairn_core::effects::StateStoreEffects;
use cairn_core::{CairnResult, Fingerprint};

/// Storage key for the applied fingerprint.
pub const APPLIED_FINGERPRINT_KEY: &str = "applied-config.fingerprint";

/// Outcome of comparing two fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// Nothing has ever been applied on this node
    FirstRun,
    /// Byte-identical to what is applied
    Unchanged,
    /// Differs from what is applied
    Changed,
}

impl ConfigChange {
    /// Whether the new configuration must be applied
    pub fn requires_apply(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Stateless fingerprint comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Compare `previous` (absent on first run) with `current`
    pub fn detect(&self, previous: Option<&Fingerprint>, current: &Fingerprint) -> ConfigChange {
        match previous {
            None => ConfigChange::FirstRun,
            Some(previous) if previous == current => ConfigChange::Unchanged,
            Some(_) => ConfigChange::Changed,
        }
    }
}

/// Persisted fingerprint of the last applied configuration
#[derive(Clone)]
pub struct AppliedFingerprint {
    store: Arc<dyn StateStoreEffects>,
}

impl AppliedFingerprint {
    /// Back the fingerprint with `store`
    pub fn new(store: Arc<dyn StateStoreEffects>) -> Self {
        Self { store }
    }

    /// Fingerprint last committed, if any
    pub async fn load(&self) -> CairnResult<Option<Fingerprint>> {
        match self.store.retrieve(APPLIED_FINGERPRINT_KEY).await? {
            Some(bytes) => {
                let hex = String::from_utf8_lossy(&bytes);
                Ok(Some(Fingerprint::from_hex(&hex)?))
            }
            None => Ok(None),
        }
    }

    /// Commit `fingerprint` as applied
    pub async fn commit(&self, fingerprint: &Fingerprint) -> CairnResult<()> {
        self.store
            .store(APPLIED_FINGERPRINT_KEY, fingerprint.to_hex().into_bytes())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_testkit::MemoryStateStore;

    #[test]
    fn detect_distinguishes_first_run() {
        let detector = ChangeDetector;
        let a = Fingerprint::of(b"a");
        let b = Fingerprint::of(b"b");
        assert_eq!(detector.detect(None, &a), ConfigChange::FirstRun);
        assert_eq!(detector.detect(Some(&a), &a), ConfigChange::Unchanged);
        assert_eq!(detector.detect(Some(&a), &b), ConfigChange::Changed);
        assert!(ConfigChange::FirstRun.requires_apply());
        assert!(!ConfigChange::Unchanged.requires_apply());
    }

    #[tokio::test]
    async fn applied_fingerprint_round_trips_through_store() {
        let store = Arc::new(MemoryStateStore::new());
        let applied = AppliedFingerprint::new(store.clone());
        assert_eq!(applied.load().await.unwrap(), None);

        let fp = Fingerprint::of(b"[mysqld]\n");
        applied.commit(&fp).await.unwrap();
        assert_eq!(applied.load().await.unwrap(), Some(fp));
    }

    #[tokio::test]
    async fn corrupt_fingerprint_is_storage_error() {
        let store = Arc::new(MemoryStateStore::new());
        store
            .store(APPLIED_FINGERPRINT_KEY, b"not-hex".to_vec())
            .await
            .unwrap();
        let err = AppliedFingerprint::new(store).load().await.unwrap_err();
        assert!(matches!(err, cairn_core::CairnError::Storage { .. }));
    }
}

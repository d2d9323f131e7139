//! One-time bootstrap marker
//!
//! Monotonic: false until [`SeedState::mark_seeded`] succeeds, true forever
//! after. Nothing in cairn resets it.
//!
//! A join restart is bracketed by a pending marker written before the
//! restart. If the restart succeeds but recording the seed fails, the marker
//! survives and the next pass completes the seed without restarting again.

use std::sync::Arc;

use cairn_core::effects::StateStoreEffects;
use cairn_core::CairnResult;

/// Storage key for the seed marker.
pub const SEEDED_KEY: &str = "seeded";

/// Storage key for a join restart that has been started but not recorded.
pub const JOIN_PENDING_KEY: &str = "join-pending";

const SEEDED_MARKER: &[u8] = b"done";
const PENDING_MARKER: &[u8] = b"pending";

/// Persisted "bootstrap completed" flag for the local node
#[derive(Clone)]
pub struct SeedState {
    store: Arc<dyn StateStoreEffects>,
}

impl SeedState {
    /// Back the flag with `store`
    pub fn new(store: Arc<dyn StateStoreEffects>) -> Self {
        Self { store }
    }

    /// Whether bootstrap has completed on this node
    pub async fn is_seeded(&self) -> CairnResult<bool> {
        Ok(self.store.exists(SEEDED_KEY).await?)
    }

    /// Whether a join restart was started without its outcome being recorded
    pub async fn is_join_pending(&self) -> CairnResult<bool> {
        Ok(self.store.exists(JOIN_PENDING_KEY).await?)
    }

    /// Record that a join restart is about to run.
    ///
    /// Fails when the store is not writable, so the caller never restarts
    /// into the cluster without being able to remember it.
    pub async fn begin_join(&self) -> CairnResult<()> {
        self.store
            .store(JOIN_PENDING_KEY, PENDING_MARKER.to_vec())
            .await?;
        Ok(())
    }

    /// Drop the pending marker after a join restart failed
    pub async fn abort_join(&self) -> CairnResult<()> {
        self.store.remove(JOIN_PENDING_KEY).await?;
        Ok(())
    }

    /// Record bootstrap completion and clear any pending join. Idempotent.
    pub async fn mark_seeded(&self) -> CairnResult<()> {
        if !self.is_seeded().await? {
            self.store.store(SEEDED_KEY, SEEDED_MARKER.to_vec()).await?;
            tracing::info!("node marked as seeded");
        }
        self.store.remove(JOIN_PENDING_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_testkit::MemoryStateStore;

    #[tokio::test]
    async fn mark_seeded_is_monotonic_and_idempotent() {
        let store = Arc::new(MemoryStateStore::new());
        let seed = SeedState::new(store.clone());
        assert!(!seed.is_seeded().await.unwrap());

        seed.mark_seeded().await.unwrap();
        seed.mark_seeded().await.unwrap();
        assert!(seed.is_seeded().await.unwrap());
        assert_eq!(store.write_count(SEEDED_KEY), 1);
    }

    #[tokio::test]
    async fn pending_join_is_cleared_by_seed_or_abort() {
        let store = Arc::new(MemoryStateStore::new());
        let seed = SeedState::new(store.clone());

        seed.begin_join().await.unwrap();
        assert!(seed.is_join_pending().await.unwrap());
        seed.abort_join().await.unwrap();
        assert!(!seed.is_join_pending().await.unwrap());

        seed.begin_join().await.unwrap();
        seed.mark_seeded().await.unwrap();
        assert!(!seed.is_join_pending().await.unwrap());
        assert!(seed.is_seeded().await.unwrap());
    }

    #[tokio::test]
    async fn begin_join_fails_on_read_only_store() {
        let store = Arc::new(MemoryStateStore::new());
        store.fail_writes(true);
        let seed = SeedState::new(store);
        assert!(seed.begin_join().await.is_err());
        assert!(!seed.is_join_pending().await.unwrap());
    }

    #[tokio::test]
    async fn seeded_flag_survives_a_new_handle() {
        let store = Arc::new(MemoryStateStore::new());
        SeedState::new(store.clone()).mark_seeded().await.unwrap();
        assert!(SeedState::new(store).is_seeded().await.unwrap());
    }
}

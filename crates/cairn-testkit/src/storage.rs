//! Memory state store

use async_trait::async_trait;
use cairn_core::effects::{StateStoreEffects, StorageError};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Memory storage handler for testing
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<HashMap<String, usize>>,
    fail_writes: Mutex<bool>,
    failing_keys: Mutex<HashSet<String>>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes to `key`
    pub fn write_count(&self, key: &str) -> usize {
        self.writes.lock().get(key).copied().unwrap_or(0)
    }

    /// Raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Make writes to `key` fail until [`Self::heal_key`]
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().insert(key.to_string());
    }

    /// Undo [`Self::fail_key`]
    pub fn heal_key(&self, key: &str) {
        self.failing_keys.lock().remove(key);
    }
}

#[async_trait]
impl StateStoreEffects for MemoryStateStore {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if *self.fail_writes.lock() || self.failing_keys.lock().contains(key) {
            return Err(StorageError::WriteFailed("injected failure".to_string()));
        }
        self.data.lock().insert(key.to_string(), value);
        *self.writes.lock().entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.lock().remove(key).is_some())
    }
}

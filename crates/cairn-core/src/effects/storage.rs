//! Persisted node state.
//!
//! A tiny key/value surface: the reconciler keeps the SeedState marker and the
//! fingerprint of the last applied configuration here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CairnError;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

impl From<StorageError> for CairnError {
    fn from(err: StorageError) -> Self {
        CairnError::storage(err.to_string())
    }
}

/// Durable byte storage surviving process restarts
#[async_trait]
pub trait StateStoreEffects: Send + Sync {
    /// Store a value, replacing any previous one
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Retrieve a value
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove a value, reporting whether it existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Whether a value exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key).await?.is_some())
    }
}

#[async_trait]
impl<T: StateStoreEffects + ?Sized> StateStoreEffects for std::sync::Arc<T> {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key).await
    }
}

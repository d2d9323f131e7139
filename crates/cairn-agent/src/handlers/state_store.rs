//! Filesystem-backed node state

use async_trait::async_trait;
use cairn_core::effects::{StateStoreEffects, StorageError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each key as `<key>.dat` under a state directory
#[derive(Debug, Clone)]
pub struct FilesystemStateStore {
    base_path: PathBuf,
}

impl FilesystemStateStore {
    /// Create a store rooted at `base_path`; the directory is created on first write
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding the state files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                reason: "Key cannot be empty".to_string(),
            });
        }
        if key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::InvalidKey {
                reason: format!("Key must be a plain file name: {key}"),
            });
        }
        Ok(self.base_path.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl StateStoreEffects for FilesystemStateStore {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let file_path = self.file_path(key)?;
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to create directory: {e}")))?;

        // Write then rename so a crash never leaves a torn marker behind
        let tmp_path = file_path.with_extension("dat.tmp");
        fs::write(&tmp_path, value)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write file: {e}")))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to replace file: {e}")))?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("Failed to read file: {e}"))),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove file: {e}"
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;
        fs::try_exists(&file_path)
            .await
            .map_err(|e| StorageError::ReadFailed(format!("Failed to stat file: {e}")))
    }
}

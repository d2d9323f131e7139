//! Configuration application sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RenderedConfig;

/// Error type for configuration sink operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{reason}")]
pub struct SinkError {
    /// Failure description
    pub reason: String,
}

impl SinkError {
    /// Create a sink error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// How the service is brought back after a configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestartMode {
    /// Restart as a standalone server
    Standalone,
    /// Restart into cluster mode, joining the existing seed
    BootstrapJoin,
}

/// Accepts rendered configuration and restarts the database service.
///
/// Both operations block until done; the caller bounds them with its own
/// timeout and never retries within one event.
#[async_trait]
pub trait ConfigSinkEffects: Send + Sync {
    /// Persist rendered configuration
    async fn apply(&self, config: &RenderedConfig) -> Result<(), SinkError>;

    /// Restart the service so it picks up the applied configuration
    async fn restart(&self, mode: RestartMode) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: ConfigSinkEffects + ?Sized> ConfigSinkEffects for std::sync::Arc<T> {
    async fn apply(&self, config: &RenderedConfig) -> Result<(), SinkError> {
        (**self).apply(config).await
    }

    async fn restart(&self, mode: RestartMode) -> Result<(), SinkError> {
        (**self).restart(mode).await
    }
}

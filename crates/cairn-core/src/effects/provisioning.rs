//! Database provisioning collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Password;

/// Error type for provisioning
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("provisioning {database} for {username}@{hostname} failed: {reason}")]
pub struct ProvisionError {
    /// Database requested
    pub database: String,
    /// User requested
    pub username: String,
    /// Host the grant was for
    pub hostname: String,
    /// Failure description
    pub reason: String,
}

/// One database + user grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantRequest {
    /// Host the consumer connects from
    pub hostname: String,
    /// Database to create
    pub database: String,
    /// User to grant
    pub username: String,
    /// Grant administrative privileges
    pub admin: bool,
}

impl GrantRequest {
    /// Build the error for a failed provision of this grant
    pub fn failed(&self, reason: impl Into<String>) -> ProvisionError {
        ProvisionError {
            database: self.database.clone(),
            username: self.username.clone(),
            hostname: self.hostname.clone(),
            reason: reason.into(),
        }
    }
}

/// Creates databases and grants, returning the user's password.
///
/// Must be idempotent: the same grant always yields the same password.
#[async_trait]
pub trait ProvisioningEffects: Send + Sync {
    /// Provision `grant`
    async fn provision(&self, grant: &GrantRequest) -> Result<Password, ProvisionError>;
}

#[async_trait]
impl<T: ProvisioningEffects + ?Sized> ProvisioningEffects for std::sync::Arc<T> {
    async fn provision(&self, grant: &GrantRequest) -> Result<Password, ProvisionError> {
        (**self).provision(grant).await
    }
}

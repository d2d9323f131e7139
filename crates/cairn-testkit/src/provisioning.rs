//! Mock database provisioner

use async_trait::async_trait;
use cairn_core::effects::{GrantRequest, ProvisionError, ProvisioningEffects};
use cairn_core::Password;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Provisioner deriving a stable password from each grant
#[derive(Debug, Default)]
pub struct MockProvisioner {
    grants: Mutex<Vec<GrantRequest>>,
    failing_databases: Mutex<HashSet<String>>,
}

impl MockProvisioner {
    /// Provisioner that succeeds for every database
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every grant for `database`
    pub fn fail_database(&self, database: impl Into<String>) {
        self.failing_databases.lock().insert(database.into());
    }

    /// Grants served, in order
    pub fn grants(&self) -> Vec<GrantRequest> {
        self.grants.lock().clone()
    }

    /// Password the provisioner hands out for a grant
    pub fn password_for(database: &str, username: &str) -> Password {
        let digest = Sha256::digest(format!("{database}:{username}").as_bytes());
        Password::new(hex::encode(&digest[..8]))
    }
}

#[async_trait]
impl ProvisioningEffects for MockProvisioner {
    async fn provision(&self, grant: &GrantRequest) -> Result<Password, ProvisionError> {
        if self.failing_databases.lock().contains(&grant.database) {
            return Err(grant.failed("injected failure"));
        }
        self.grants.lock().push(grant.clone());
        Ok(Self::password_for(&grant.database, &grant.username))
    }
}

//! Mock resource manager

use async_trait::async_trait;
use cairn_core::effects::{HaResourceSet, LeadershipState, ResourceEffects, ResourceError};
use cairn_core::{NodeAddress, ResourceId};
use parking_lot::Mutex;

/// Resource manager whose ownership answer tests control
#[derive(Debug, Default)]
pub struct MockResourceManager {
    managed: Mutex<bool>,
    owner: Mutex<Option<NodeAddress>>,
    unavailable: Mutex<bool>,
    defined: Mutex<Vec<HaResourceSet>>,
    queries: Mutex<usize>,
}

impl MockResourceManager {
    /// No resource manager formed yet
    pub fn unmanaged() -> Self {
        Self::default()
    }

    /// Managed, held by `owner`
    pub fn owned_by(owner: impl Into<NodeAddress>) -> Self {
        let manager = Self::default();
        manager.set_owner(Some(owner.into()));
        manager
    }

    /// Set the owner; also marks the resource as managed
    pub fn set_owner(&self, owner: Option<NodeAddress>) {
        *self.managed.lock() = true;
        *self.owner.lock() = owner;
    }

    /// Drop back to the unmanaged state
    pub fn set_unmanaged(&self) {
        *self.managed.lock() = false;
        *self.owner.lock() = None;
    }

    /// Make queries fail
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Resource sets submitted so far
    pub fn defined(&self) -> Vec<HaResourceSet> {
        self.defined.lock().clone()
    }

    /// Number of leadership queries served
    pub fn query_count(&self) -> usize {
        *self.queries.lock()
    }
}

#[async_trait]
impl ResourceEffects for MockResourceManager {
    async fn leadership(&self, resource: &ResourceId) -> Result<LeadershipState, ResourceError> {
        *self.queries.lock() += 1;
        if *self.unavailable.lock() {
            return Err(ResourceError::Unavailable {
                reason: "injected failure".to_string(),
            });
        }
        Ok(LeadershipState {
            resource: resource.clone(),
            managed: *self.managed.lock(),
            owner: self.owner.lock().clone(),
        })
    }

    async fn define_resources(&self, resources: &HaResourceSet) -> Result<(), ResourceError> {
        self.defined.lock().push(resources.clone());
        Ok(())
    }
}

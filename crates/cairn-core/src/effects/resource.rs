//! Cluster-resource manager interface.
//!
//! The resource manager owns floating resources (the virtual address) and
//! already guarantees single ownership. Cairn only observes its answer and
//! hands it resource definitions when the HA relation forms.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{NodeAddress, ResourceId};

/// Error type for resource manager queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ResourceError {
    #[error("resource manager unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Observed ownership of one floating resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadershipState {
    /// Resource queried
    pub resource: ResourceId,
    /// False until a resource manager has formed and manages the resource
    pub managed: bool,
    /// Current owner; `None` is a valid transient state
    pub owner: Option<NodeAddress>,
}

impl LeadershipState {
    /// Resource not under management
    pub fn unmanaged(resource: ResourceId) -> Self {
        Self {
            resource,
            managed: false,
            owner: None,
        }
    }

    /// Resource managed and held by `owner`
    pub fn owned_by(resource: ResourceId, owner: NodeAddress) -> Self {
        Self {
            resource,
            managed: true,
            owner: Some(owner),
        }
    }
}

/// Resource and constraint definitions for the floating address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaResourceSet {
    /// Interface the manager's ring binds to
    pub bindiface: String,
    /// Ring multicast port
    pub mcastport: u16,
    /// Resource name -> agent type
    pub resources: BTreeMap<String, String>,
    /// Resource name -> agent parameters
    pub resource_params: BTreeMap<String, String>,
    /// Group name -> member resources
    pub groups: BTreeMap<String, String>,
}

/// Floating-resource manager
#[async_trait]
pub trait ResourceEffects: Send + Sync {
    /// Current ownership of `resource`
    async fn leadership(&self, resource: &ResourceId) -> Result<LeadershipState, ResourceError>;

    /// Submit resource definitions at cluster-formation time
    async fn define_resources(&self, resources: &HaResourceSet) -> Result<(), ResourceError>;
}

#[async_trait]
impl<T: ResourceEffects + ?Sized> ResourceEffects for std::sync::Arc<T> {
    async fn leadership(&self, resource: &ResourceId) -> Result<LeadershipState, ResourceError> {
        (**self).leadership(resource).await
    }

    async fn define_resources(&self, resources: &HaResourceSet) -> Result<(), ResourceError> {
        (**self).define_resources(resources).await
    }
}

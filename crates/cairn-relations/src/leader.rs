//! Leadership observation
//!
//! The resource manager decides who owns the floating address; this module
//! only reads that answer, once per event. Before a resource manager has
//! formed, the oldest peer of the current topology is treated as leader, so a
//! lone node can serve consumers. Any failure to find out resolves to "not
//! leader".

use std::sync::Arc;

use cairn_cluster::MembershipView;
use cairn_core::effects::ResourceEffects;
use cairn_core::{CairnError, ResourceId};

/// Outcome of one leadership query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leadership {
    /// This node answers consumers; `clustered` when the resource manager
    /// holds the floating address for it
    Leader {
        /// Resource under management
        clustered: bool,
    },
    /// Another node (or nobody) holds the resource
    Follower,
    /// Ownership could not be determined
    Unknown(CairnError),
}

impl Leadership {
    /// Whether this node may answer consumers
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader { .. })
    }

    /// Whether this node holds a managed floating address
    pub fn holds_resource(&self) -> bool {
        matches!(self, Self::Leader { clustered: true })
    }
}

/// Observes floating-resource ownership for the local node
#[derive(Clone)]
pub struct LeaderElector {
    membership: MembershipView,
    resources: Arc<dyn ResourceEffects>,
}

impl LeaderElector {
    /// Create an elector for the node behind `membership`
    pub fn new(membership: MembershipView, resources: Arc<dyn ResourceEffects>) -> Self {
        Self {
            membership,
            resources,
        }
    }

    /// Query current leadership of `resource`
    pub async fn assess(&self, resource: &ResourceId) -> Leadership {
        let local = &self.membership.node().address;
        let state = match self.resources.leadership(resource).await {
            Ok(state) => state,
            Err(e) => {
                let err = CairnError::leadership_unknown(resource.as_str(), e.to_string());
                tracing::warn!(%resource, error = %err, "treating node as non-leader");
                return Leadership::Unknown(err);
            }
        };

        if state.managed {
            return if state.owner.as_ref() == Some(local) {
                Leadership::Leader { clustered: true }
            } else {
                tracing::debug!(%resource, owner = ?state.owner, "resource held elsewhere");
                Leadership::Follower
            };
        }

        match self.membership.topology().await {
            Ok(topology) if topology.is_oldest(local) => Leadership::Leader { clustered: false },
            Ok(_) => Leadership::Follower,
            Err(e) => {
                let err = CairnError::leadership_unknown(resource.as_str(), e.to_string());
                tracing::warn!(%resource, error = %err, "treating node as non-leader");
                Leadership::Unknown(err)
            }
        }
    }

    /// Whether this node may answer consumers for `resource`
    pub async fn is_leader(&self, resource: &ResourceId) -> bool {
        self.assess(resource).await.is_leader()
    }
}

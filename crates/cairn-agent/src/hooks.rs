//! Hook name dispatch
//!
//! Maps lifecycle hook names onto [`ClusterAgent`] event handlers.

use std::str::FromStr;

use cairn_core::{CairnError, CairnResult, RelationId, RelationKind, ResourceId};

use crate::agent::ClusterAgent;

/// Hook name not handled by cairn
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook {0}")]
pub struct UnregisteredHook(pub String);

/// Lifecycle hooks the agent reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Peer relation data changed
    ClusterRelationChanged,
    /// Service configuration changed
    ConfigChanged,
    /// Software upgraded
    UpgradeCharm,
    /// Consumer request on a relation of this class
    ConsumerRelationChanged(RelationKind),
    /// HA relation formed
    HaRelationJoined,
    /// HA relation reported a leadership change
    HaRelationChanged,
}

impl FromStr for Hook {
    type Err = UnregisteredHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster-relation-changed" => Ok(Self::ClusterRelationChanged),
            "config-changed" => Ok(Self::ConfigChanged),
            "upgrade-charm" => Ok(Self::UpgradeCharm),
            "shared-db-relation-changed" => {
                Ok(Self::ConsumerRelationChanged(RelationKind::SharedDb))
            }
            "db-relation-changed" => Ok(Self::ConsumerRelationChanged(RelationKind::Db)),
            "db-admin-relation-changed" => {
                Ok(Self::ConsumerRelationChanged(RelationKind::DbAdmin))
            }
            "ha-relation-joined" => Ok(Self::HaRelationJoined),
            "ha-relation-changed" => Ok(Self::HaRelationChanged),
            other => Err(UnregisteredHook(other.to_string())),
        }
    }
}

/// Arguments some hooks need
#[derive(Debug, Clone, Default)]
pub struct HookArgs {
    /// Relation the event fired on, for consumer hooks
    pub relation: Option<RelationId>,
    /// Resource whose leadership changed; defaults to the leader resource
    pub resource: Option<ResourceId>,
}

/// Run the handler for `hook`
pub async fn dispatch(agent: &mut ClusterAgent, hook: Hook, args: HookArgs) -> CairnResult<()> {
    match hook {
        Hook::ClusterRelationChanged => {
            agent.on_membership_changed().await?;
            // Fallback leadership follows the oldest peer, so answers may move
            let summary = agent.reconcile_relations().await?;
            tracing::debug!(
                answered = summary.outcomes.len(),
                failed = summary.errors.len(),
                "consumer relations reconciled"
            );
        }
        Hook::ConfigChanged => {
            // Agent was built from freshly loaded configuration
            let config = agent.config().clone();
            agent.on_config_inputs_changed(config).await?;
        }
        Hook::UpgradeCharm => {
            agent.on_upgrade().await?;
        }
        Hook::ConsumerRelationChanged(kind) => {
            let relation = args.relation.ok_or_else(|| {
                CairnError::relation(format!("{kind} hook needs a relation id"))
            })?;
            if relation.kind != kind {
                return Err(CairnError::relation(format!(
                    "relation {relation} does not belong to {kind}"
                )));
            }
            let outcome = agent.on_consumer_relation_request(&relation).await?;
            tracing::debug!(%relation, ?outcome, "consumer request handled");
        }
        Hook::HaRelationJoined => {
            let set = agent.on_ha_relation_joined().await?;
            tracing::debug!(resources = set.resources.len(), "ha resources defined");
        }
        Hook::HaRelationChanged => {
            let resource = args
                .resource
                .unwrap_or_else(|| agent.config().leader_resource_id());
            let outcome = agent.on_leadership_changed(&resource).await?;
            tracing::debug!(%resource, ?outcome, "leadership change handled");
        }
    }
    Ok(())
}

//! Failover notification
//!
//! On a leadership change the new holder of the floating address pushes it to
//! every consumer relation; every other node scrubs what it published. A
//! consumer therefore sees the current leader's address or nothing.

use std::sync::Arc;

use cairn_core::effects::RelationEffects;
use cairn_core::{CairnError, CairnResult, RelationId, RelationKind, RelationSettings, ResourceId};

use crate::leader::LeaderElector;

/// What the notifier did for one leadership change
#[derive(Debug)]
pub enum FailoverOutcome {
    /// Event concerned a resource other than the leader resource
    Ignored,
    /// Leader without a managed address; published settings left as they are
    Unchanged,
    /// Floating address pushed to these relations
    Pushed {
        /// Relations updated
        relations: Vec<RelationId>,
        /// Relations that could not be updated
        errors: Vec<(RelationId, CairnError)>,
    },
    /// Published settings cleared on these relations
    Scrubbed {
        /// Relations cleared
        relations: Vec<RelationId>,
        /// Relations that could not be cleared
        errors: Vec<(RelationId, CairnError)>,
    },
}

/// Pushes or scrubs the floating address on consumer relations
#[derive(Clone)]
pub struct FailoverNotifier {
    leader_resource: ResourceId,
    vip: Option<String>,
    elector: LeaderElector,
    relations: Arc<dyn RelationEffects>,
}

impl FailoverNotifier {
    /// Create a notifier for `leader_resource`
    pub fn new(
        leader_resource: ResourceId,
        vip: Option<String>,
        elector: LeaderElector,
        relations: Arc<dyn RelationEffects>,
    ) -> Self {
        Self {
            leader_resource,
            vip,
            elector,
            relations,
        }
    }

    /// React to a change in ownership of `resource`
    pub async fn on_leadership_changed(
        &self,
        resource: &ResourceId,
    ) -> CairnResult<FailoverOutcome> {
        if resource != &self.leader_resource {
            tracing::debug!(%resource, "leadership change for unrelated resource");
            return Ok(FailoverOutcome::Ignored);
        }

        let leadership = self.elector.assess(resource).await;
        if leadership.holds_resource() {
            let vip = self.vip.clone().ok_or_else(|| {
                CairnError::config("holding floating address but no vip configured")
            })?;
            tracing::info!(%resource, %vip, "cluster configured, notifying consumers");
            self.push(&vip).await
        } else if leadership.is_leader() {
            tracing::debug!(%resource, "no managed address to fail over");
            Ok(FailoverOutcome::Unchanged)
        } else {
            tracing::info!(%resource, "not leader, clearing consumer relation data");
            self.scrub().await
        }
    }

    async fn consumer_relations(&self) -> CairnResult<Vec<RelationId>> {
        let mut all = Vec::new();
        for kind in RelationKind::ALL {
            all.extend(self.relations.relation_ids(kind).await?);
        }
        Ok(all)
    }

    async fn push(&self, vip: &str) -> CairnResult<FailoverOutcome> {
        let mut relations = Vec::new();
        let mut errors = Vec::new();
        for relation in self.consumer_relations().await? {
            let settings =
                RelationSettings::from([(relation.kind.host_key().to_string(), vip.to_string())]);
            match self.relations.publish(&relation, settings).await {
                Ok(()) => relations.push(relation),
                Err(e) => {
                    tracing::warn!(%relation, error = %e, "failed to push floating address");
                    errors.push((relation, e));
                }
            }
        }
        Ok(FailoverOutcome::Pushed { relations, errors })
    }

    async fn scrub(&self) -> CairnResult<FailoverOutcome> {
        let mut relations = Vec::new();
        let mut errors = Vec::new();
        for relation in self.consumer_relations().await? {
            match self.relations.clear(&relation).await {
                Ok(()) => relations.push(relation),
                Err(e) => {
                    tracing::warn!(%relation, error = %e, "failed to clear relation");
                    errors.push((relation, e));
                }
            }
        }
        Ok(FailoverOutcome::Scrubbed { relations, errors })
    }
}

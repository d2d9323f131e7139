//! Consumer relation brokering
//!
//! Only the leader answers consumers. A node that is not leader, or cannot
//! tell, clears whatever it published on the relation and stops. The leader
//! provisions credentials and publishes them with the host consumers should
//! connect to: the floating address when one is managed, else its own.

use std::sync::Arc;

use cairn_core::effects::{ProvisioningEffects, RelationEffects};
use cairn_core::{
    CairnError, CairnResult, NodeAddress, RelationId, RelationKind, RelationSettings, ResourceId,
};

use crate::leader::{LeaderElector, Leadership};
use crate::request::{password_key, DatabaseRequest, SingleRequest, PRIVATE_ADDRESS};

/// What the broker did for one relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerOutcome {
    /// Not leader; published settings cleared
    Cleared,
    /// Settings published; keys listed in order
    Published {
        /// Keys written
        keys: Vec<String>,
        /// Batch prefixes whose provisioning failed
        failed: Vec<String>,
    },
    /// Leader, but nothing to answer yet
    NothingToPublish {
        /// Batch prefixes whose provisioning failed
        failed: Vec<String>,
    },
}

/// Result of brokering every established relation
#[derive(Debug, Default)]
pub struct BrokerSummary {
    /// Per-relation outcomes
    pub outcomes: Vec<(RelationId, BrokerOutcome)>,
    /// Per-relation failures; they never stop other relations
    pub errors: Vec<(RelationId, CairnError)>,
}

/// Answers consumer relation requests on behalf of the service
#[derive(Clone)]
pub struct RelationBroker {
    local_address: NodeAddress,
    leader_resource: ResourceId,
    vip: Option<String>,
    elector: LeaderElector,
    relations: Arc<dyn RelationEffects>,
    provisioner: Arc<dyn ProvisioningEffects>,
}

impl RelationBroker {
    /// Create a broker for the local node
    pub fn new(
        local_address: NodeAddress,
        leader_resource: ResourceId,
        vip: Option<String>,
        elector: LeaderElector,
        relations: Arc<dyn RelationEffects>,
        provisioner: Arc<dyn ProvisioningEffects>,
    ) -> Self {
        Self {
            local_address,
            leader_resource,
            vip,
            elector,
            relations,
            provisioner,
        }
    }

    /// Handle a request event on one relation
    pub async fn on_request(&self, relation: &RelationId) -> CairnResult<BrokerOutcome> {
        let leadership = self.elector.assess(&self.leader_resource).await;
        self.answer(relation, &leadership).await
    }

    /// Re-answer every established consumer relation under one leadership read
    pub async fn reconcile_all(&self) -> CairnResult<BrokerSummary> {
        let leadership = self.elector.assess(&self.leader_resource).await;
        let mut summary = BrokerSummary::default();
        for kind in RelationKind::ALL {
            for relation in self.relations.relation_ids(kind).await? {
                match self.answer(&relation, &leadership).await {
                    Ok(outcome) => summary.outcomes.push((relation, outcome)),
                    Err(e) => {
                        tracing::warn!(%relation, error = %e, "relation not answered");
                        summary.errors.push((relation, e));
                    }
                }
            }
        }
        Ok(summary)
    }

    async fn answer(
        &self,
        relation: &RelationId,
        leadership: &Leadership,
    ) -> CairnResult<BrokerOutcome> {
        let clustered = match leadership {
            Leadership::Leader { clustered } => *clustered,
            Leadership::Follower | Leadership::Unknown(_) => {
                tracing::info!(
                    %relation,
                    "service is peered and this node is not the leader, clearing relation"
                );
                self.relations.clear(relation).await?;
                return Ok(BrokerOutcome::Cleared);
            }
        };

        let host = self.db_host(clustered)?;
        match relation.kind {
            RelationKind::SharedDb => self.answer_shared_db(relation, &host).await,
            RelationKind::Db => self.answer_db(relation, &host, false).await,
            RelationKind::DbAdmin => self.answer_db(relation, &host, true).await,
        }
    }

    fn db_host(&self, clustered: bool) -> CairnResult<String> {
        if clustered {
            self.vip
                .clone()
                .ok_or_else(|| CairnError::config("clustered but no vip configured"))
        } else {
            Ok(self.local_address.to_string())
        }
    }

    async fn answer_shared_db(
        &self,
        relation: &RelationId,
        host: &str,
    ) -> CairnResult<BrokerOutcome> {
        let settings = self.relations.request(relation).await?;
        match DatabaseRequest::parse(&settings) {
            DatabaseRequest::Single(request) => {
                let password = self
                    .provisioner
                    .provision(&request.grant(false))
                    .await
                    .map_err(|e| CairnError::provision(relation.to_string(), e.to_string()))?;
                let reply = RelationSettings::from([
                    ("db_host".to_string(), host.to_string()),
                    ("password".to_string(), password.expose().to_string()),
                ]);
                self.publish(relation, reply, Vec::new()).await
            }
            DatabaseRequest::Batch(batch) => {
                let mut reply = RelationSettings::new();
                let mut failed = Vec::new();
                for (prefix, request) in &batch.requests {
                    match self.provisioner.provision(&request.grant(false)).await {
                        Ok(password) => {
                            reply.insert(password_key(prefix), password.expose().to_string());
                        }
                        Err(e) => {
                            tracing::warn!(
                                %relation,
                                prefix = %prefix,
                                error = %e,
                                "provisioning failed"
                            );
                            failed.push(prefix.clone());
                        }
                    }
                }
                if reply.is_empty() {
                    tracing::debug!(%relation, "no database request resolved, nothing published");
                    return Ok(BrokerOutcome::NothingToPublish { failed });
                }
                reply.insert("db_host".to_string(), host.to_string());
                self.publish(relation, reply, failed).await
            }
        }
    }

    async fn answer_db(
        &self,
        relation: &RelationId,
        host: &str,
        admin: bool,
    ) -> CairnResult<BrokerOutcome> {
        let consumer = self
            .relations
            .remote_identity(relation)
            .await?
            .ok_or_else(|| CairnError::relation(format!("no remote consumer on {relation}")))?;
        let settings = self.relations.request(relation).await?;
        let Some(hostname) = settings.get(PRIVATE_ADDRESS) else {
            tracing::debug!(%relation, %consumer, "consumer address not yet known");
            return Ok(BrokerOutcome::NothingToPublish { failed: Vec::new() });
        };

        let request = SingleRequest::for_consumer(&consumer, hostname.as_str());
        let password = self
            .provisioner
            .provision(&request.grant(admin))
            .await
            .map_err(|e| CairnError::provision(relation.to_string(), e.to_string()))?;
        let reply = RelationSettings::from([
            ("database".to_string(), request.database),
            ("user".to_string(), request.username),
            ("password".to_string(), password.expose().to_string()),
            ("host".to_string(), host.to_string()),
        ]);
        self.publish(relation, reply, Vec::new()).await
    }

    async fn publish(
        &self,
        relation: &RelationId,
        reply: RelationSettings,
        failed: Vec<String>,
    ) -> CairnResult<BrokerOutcome> {
        let keys: Vec<String> = reply.keys().cloned().collect();
        self.relations.publish(relation, reply).await?;
        tracing::info!(%relation, keys = ?keys, "published connection settings");
        Ok(BrokerOutcome::Published { keys, failed })
    }
}

//! Per-node event handlers
//!
//! [`ClusterAgent`] is the surface callers drive: one method per triggering
//! event, each running a single pass to completion. All collaborators are
//! injected through [`Collaborators`]; nothing is looked up ambiently.
//! Repeated delivery of the same logical event is harmless: the reconciler
//! no-ops on an unchanged fingerprint and relation answers are deterministic.

use std::sync::Arc;

use cairn_cluster::{
    define_vip_resources, ClusterReconciler, ClusterTopology, MembershipView, NodeState,
    ReconcileReport,
};
use cairn_core::effects::{
    ConfigSinkEffects, HaResourceSet, MembershipEffects, ProvisioningEffects, RelationEffects,
    ResourceEffects, StateStoreEffects,
};
use cairn_core::{CairnResult, Node, RelationId, RenderedConfig, ResourceId, ServiceConfig};
use cairn_relations::{
    BrokerOutcome, BrokerSummary, FailoverNotifier, FailoverOutcome, LeaderElector,
    RelationBroker,
};

/// Every external collaborator a node talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Peer membership source
    pub membership: Arc<dyn MembershipEffects>,
    /// Floating-resource manager
    pub resources: Arc<dyn ResourceEffects>,
    /// Configuration sink
    pub sink: Arc<dyn ConfigSinkEffects>,
    /// Database provisioner
    pub provisioner: Arc<dyn ProvisioningEffects>,
    /// Consumer relation channel
    pub relations: Arc<dyn RelationEffects>,
    /// Persisted node state
    pub store: Arc<dyn StateStoreEffects>,
}

/// Event-driven coordinator for one node
pub struct ClusterAgent {
    config: ServiceConfig,
    membership: MembershipView,
    reconciler: ClusterReconciler,
    elector: LeaderElector,
    collaborators: Collaborators,
}

impl ClusterAgent {
    /// Create an agent for `node` with validated `config`
    pub fn new(
        config: ServiceConfig,
        node: Node,
        collaborators: Collaborators,
    ) -> CairnResult<Self> {
        config.validate()?;
        let membership = MembershipView::new(node, collaborators.membership.clone());
        let reconciler = ClusterReconciler::with_store(
            membership.clone(),
            collaborators.store.clone(),
            collaborators.sink.clone(),
        );
        let elector = LeaderElector::new(membership.clone(), collaborators.resources.clone());
        Ok(Self {
            config,
            membership,
            reconciler,
            elector,
            collaborators,
        })
    }

    /// Current configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Local node identity
    pub fn node(&self) -> &Node {
        self.membership.node()
    }

    /// Peers joined or departed
    pub async fn on_membership_changed(&self) -> CairnResult<ReconcileReport> {
        tracing::info!("membership changed");
        self.reconcile().await
    }

    /// Service configuration changed; `config` replaces the current one
    pub async fn on_config_inputs_changed(
        &mut self,
        config: ServiceConfig,
    ) -> CairnResult<ReconcileReport> {
        config.validate()?;
        tracing::info!("configuration inputs changed");
        self.config = config;
        self.reconcile().await
    }

    /// Software upgraded in place
    pub async fn on_upgrade(&self) -> CairnResult<ReconcileReport> {
        tracing::info!("upgrade completed");
        self.reconcile().await
    }

    /// A consumer wrote a request on `relation`
    pub async fn on_consumer_relation_request(
        &self,
        relation: &RelationId,
    ) -> CairnResult<BrokerOutcome> {
        self.broker().on_request(relation).await
    }

    /// Re-answer every consumer relation
    pub async fn reconcile_relations(&self) -> CairnResult<BrokerSummary> {
        self.broker().reconcile_all().await
    }

    /// Ownership of `resource` changed
    pub async fn on_leadership_changed(
        &self,
        resource: &ResourceId,
    ) -> CairnResult<FailoverOutcome> {
        self.notifier().on_leadership_changed(resource).await
    }

    /// HA relation formed; hand floating address definitions to the manager
    pub async fn on_ha_relation_joined(&self) -> CairnResult<HaResourceSet> {
        define_vip_resources(&self.collaborators.resources, &self.config).await
    }

    /// Current cluster topology, local node included
    pub async fn topology(&self) -> CairnResult<ClusterTopology> {
        self.membership.topology().await
    }

    /// Configuration the next pass would apply
    pub async fn rendered_config(&self) -> CairnResult<RenderedConfig> {
        let settings = self.config.base_settings()?;
        self.reconciler
            .render(&self.config.secrets(), &settings)
            .await
    }

    /// Current node lifecycle state
    pub async fn node_state(&self) -> CairnResult<NodeState> {
        self.reconciler.node_state().await
    }

    /// Whether this node currently answers consumers
    pub async fn is_leader(&self) -> bool {
        self.elector
            .is_leader(&self.config.leader_resource_id())
            .await
    }

    async fn reconcile(&self) -> CairnResult<ReconcileReport> {
        let secrets = self.config.secrets();
        let settings = self.config.base_settings()?;
        let report = self.reconciler.reconcile(&secrets, &settings).await?;
        tracing::info!(
            action = ?report.action,
            state = ?report.state,
            fingerprint = %report.fingerprint,
            "reconciliation complete"
        );
        Ok(report)
    }

    fn broker(&self) -> RelationBroker {
        RelationBroker::new(
            self.node().address.clone(),
            self.config.leader_resource_id(),
            self.config.vip.clone(),
            self.elector.clone(),
            self.collaborators.relations.clone(),
            self.collaborators.provisioner.clone(),
        )
    }

    fn notifier(&self) -> FailoverNotifier {
        FailoverNotifier::new(
            self.config.leader_resource_id(),
            self.config.vip.clone(),
            self.elector.clone(),
            self.collaborators.relations.clone(),
        )
    }
}

//! Cluster reconciliation state machine
//!
//! Every membership, upgrade or configuration event runs one pass:
//!
//! 1. snapshot the topology
//! 2. render configuration for it
//! 3. compare against the applied fingerprint
//! 4. unchanged: stop, touching nothing
//! 5. changed: apply, then pick exactly one of
//!    - bootstrap-join (multi-node, not oldest, not yet seeded), then mark seeded
//!    - standalone restart (single node)
//!    - no restart (oldest peer or already seeded cluster member)
//!
//! The applied fingerprint is committed last, after every step above
//! succeeded. A failed apply or restart therefore leaves persisted state as it
//! was and the next event re-runs the whole decision.
//!
//! The oldest peer is the bootstrap origin and is never restarted into join
//! mode; a joiner restarts into the cluster at most once because SeedState is
//! monotonic and a pending-join marker is written before the join restart.

use std::sync::Arc;

use cairn_core::effects::{ConfigSinkEffects, RestartMode, StateStoreEffects};
use cairn_core::{BaseSettings, CairnError, CairnResult, Fingerprint, RenderedConfig, Secrets};

use crate::change::{AppliedFingerprint, ChangeDetector, ConfigChange};
use crate::membership::{ClusterTopology, MembershipView};
use crate::render::{ConfigRenderer, RenderInputs};
use crate::seed::SeedState;

/// Per-node lifecycle state, derived from persisted state and topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No configuration applied yet
    Unconfigured,
    /// Running standalone
    SingleNode,
    /// Part of a multi-node topology but not yet joined
    AwaitingSeed,
    /// Bootstrap origin or a seeded member
    Clustered,
}

impl NodeState {
    fn derive(applied: bool, topology: &ClusterTopology, is_oldest: bool, seeded: bool) -> Self {
        if !applied {
            Self::Unconfigured
        } else if !topology.is_multi_node() {
            Self::SingleNode
        } else if !is_oldest && !seeded {
            Self::AwaitingSeed
        } else {
            Self::Clustered
        }
    }
}

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Derived configuration unchanged, nothing touched
    None,
    /// Restarted into cluster mode and marked seeded
    BootstrapJoin,
    /// Restarted standalone with new configuration
    StandaloneRestart,
    /// Configuration persisted, service left running
    AppliedWithoutRestart,
}

/// Restart decision for a changed configuration
pub fn decide_action(is_multi_node: bool, is_oldest: bool, seeded: bool) -> ReconcileAction {
    if is_multi_node && !is_oldest && !seeded {
        ReconcileAction::BootstrapJoin
    } else if !is_multi_node {
        ReconcileAction::StandaloneRestart
    } else {
        ReconcileAction::AppliedWithoutRestart
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Result of change detection
    pub change: ConfigChange,
    /// Action taken
    pub action: ReconcileAction,
    /// Node state after the pass
    pub state: NodeState,
    /// Fingerprint of the configuration rendered in this pass
    pub fingerprint: Fingerprint,
    /// Members in the topology snapshot
    pub topology_size: usize,
}

/// Orchestrates rendering, change detection and restarts for the local node
#[derive(Clone)]
pub struct ClusterReconciler {
    membership: MembershipView,
    renderer: ConfigRenderer,
    detector: ChangeDetector,
    seed: SeedState,
    applied: AppliedFingerprint,
    sink: Arc<dyn ConfigSinkEffects>,
}

impl ClusterReconciler {
    /// Assemble a reconciler from its collaborators
    pub fn new(
        membership: MembershipView,
        renderer: ConfigRenderer,
        seed: SeedState,
        applied: AppliedFingerprint,
        sink: Arc<dyn ConfigSinkEffects>,
    ) -> Self {
        Self {
            membership,
            renderer,
            detector: ChangeDetector,
            seed,
            applied,
            sink,
        }
    }

    /// Build SeedState and the applied fingerprint over one state store
    pub fn with_store(
        membership: MembershipView,
        store: Arc<dyn StateStoreEffects>,
        sink: Arc<dyn ConfigSinkEffects>,
    ) -> Self {
        Self::new(
            membership,
            ConfigRenderer::new(),
            SeedState::new(store.clone()),
            AppliedFingerprint::new(store),
            sink,
        )
    }

    /// Membership view used for topology snapshots
    pub fn membership(&self) -> &MembershipView {
        &self.membership
    }

    /// Seed marker of the local node
    pub fn seed_state(&self) -> &SeedState {
        &self.seed
    }

    /// Run one reconciliation pass
    pub async fn reconcile(
        &self,
        secrets: &Secrets,
        settings: &BaseSettings,
    ) -> CairnResult<ReconcileReport> {
        let local = &self.membership.node().address;
        let topology = self.membership.topology().await?;
        let rendered = self.render_for(&topology, secrets, settings)?;
        let fingerprint = rendered.fingerprint();

        let previous = self.applied.load().await?;
        let change = self.detector.detect(previous.as_ref(), &fingerprint);
        let is_oldest = topology.is_oldest(local);

        if !change.requires_apply() {
            tracing::debug!(%fingerprint, "configuration unchanged, nothing to do");
            let seeded = self.seed.is_seeded().await?;
            return Ok(ReconcileReport {
                change,
                action: ReconcileAction::None,
                state: NodeState::derive(true, &topology, is_oldest, seeded),
                fingerprint,
                topology_size: topology.len(),
            });
        }

        tracing::info!(
            ?change,
            %fingerprint,
            members = topology.len(),
            "configuration changed, applying"
        );
        self.sink
            .apply(&rendered)
            .await
            .map_err(|e| CairnError::apply(e.reason))?;

        let mut seeded = self.seed.is_seeded().await?;
        if !seeded && self.seed.is_join_pending().await? {
            // Join restart already ran; only its record was lost
            tracing::warn!("completing seed left pending by an earlier join restart");
            self.seed.mark_seeded().await?;
            seeded = true;
        }
        let action = decide_action(topology.is_multi_node(), is_oldest, seeded);
        match action {
            ReconcileAction::BootstrapJoin => {
                tracing::info!(oldest = ?topology.oldest(), "joining seeded cluster");
                self.seed.begin_join().await?;
                if let Err(e) = self.restart(RestartMode::BootstrapJoin).await {
                    if let Err(abort) = self.seed.abort_join().await {
                        tracing::error!(error = %abort, "failed to clear pending join");
                    }
                    return Err(e);
                }
                self.seed.mark_seeded().await?;
            }
            ReconcileAction::StandaloneRestart => {
                tracing::info!("restarting standalone with new configuration");
                self.restart(RestartMode::Standalone).await?;
            }
            ReconcileAction::AppliedWithoutRestart => {
                // Picked up on the next restart cycle
                tracing::info!(is_oldest, seeded, "configuration applied without restart");
            }
            ReconcileAction::None => {}
        }

        self.applied.commit(&fingerprint).await?;
        let seeded = seeded || action == ReconcileAction::BootstrapJoin;
        Ok(ReconcileReport {
            change,
            action,
            state: NodeState::derive(true, &topology, is_oldest, seeded),
            fingerprint,
            topology_size: topology.len(),
        })
    }

    /// Render the configuration the next pass would apply, without applying it
    pub async fn render(
        &self,
        secrets: &Secrets,
        settings: &BaseSettings,
    ) -> CairnResult<RenderedConfig> {
        let topology = self.membership.topology().await?;
        self.render_for(&topology, secrets, settings)
    }

    fn render_for(
        &self,
        topology: &ClusterTopology,
        secrets: &Secrets,
        settings: &BaseSettings,
    ) -> CairnResult<RenderedConfig> {
        self.renderer.render(RenderInputs {
            local_address: &self.membership.node().address,
            topology,
            secrets,
            settings,
        })
    }

    /// Current node state without changing anything
    pub async fn node_state(&self) -> CairnResult<NodeState> {
        let topology = self.membership.topology().await?;
        let applied = self.applied.load().await?.is_some();
        let seeded = self.seed.is_seeded().await? || self.seed.is_join_pending().await?;
        let is_oldest = topology.is_oldest(&self.membership.node().address);
        Ok(NodeState::derive(applied, &topology, is_oldest, seeded))
    }

    async fn restart(&self, mode: RestartMode) -> CairnResult<()> {
        self.sink.restart(mode).await.map_err(|e| {
            tracing::error!(?mode, error = %e, "service restart failed");
            CairnError::restart(e.reason)
        })
    }
}

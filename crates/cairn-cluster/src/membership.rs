//! Peer membership view
//!
//! Turns raw membership data into a [`ClusterTopology`] snapshot ordered by
//! join time. Every node that sees the same membership data computes the same
//! order, so "oldest peer" is agreed cluster-wide without a vote.

use std::collections::BTreeMap;
use std::sync::Arc;

use cairn_core::effects::MembershipEffects;
use cairn_core::{CairnResult, Node, NodeAddress, PeerMember};

/// Snapshot of the peer group, oldest member first.
///
/// Never cached across events; recompute it on every reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    members: Vec<PeerMember>,
}

impl ClusterTopology {
    /// Build a topology from unordered, possibly duplicated member records.
    ///
    /// Duplicate addresses keep their earliest join position. Ties on
    /// `join_order` fall back to address order so the result never depends on
    /// input order.
    pub fn from_members(members: impl IntoIterator<Item = PeerMember>) -> Self {
        let mut earliest: BTreeMap<NodeAddress, u64> = BTreeMap::new();
        for member in members {
            earliest
                .entry(member.address)
                .and_modify(|order| *order = (*order).min(member.join_order))
                .or_insert(member.join_order);
        }

        let mut members: Vec<PeerMember> = earliest
            .into_iter()
            .map(|(address, join_order)| PeerMember {
                address,
                join_order,
            })
            .collect();
        members.sort_by(|a, b| {
            a.join_order
                .cmp(&b.join_order)
                .then_with(|| a.address.cmp(&b.address))
        });

        Self { members }
    }

    /// Members in join order
    pub fn members(&self) -> &[PeerMember] {
        &self.members
    }

    /// Member addresses in join order
    pub fn addresses(&self) -> impl Iterator<Item = &NodeAddress> {
        self.members.iter().map(|m| &m.address)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the topology has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// More than one member
    pub fn is_multi_node(&self) -> bool {
        self.members.len() > 1
    }

    /// First member by join order
    pub fn oldest(&self) -> Option<&NodeAddress> {
        self.members.first().map(|m| &m.address)
    }

    /// Whether `address` is the oldest member
    pub fn is_oldest(&self, address: &NodeAddress) -> bool {
        self.oldest() == Some(address)
    }
}

/// Derives topology snapshots for the local node from the membership source
#[derive(Clone)]
pub struct MembershipView {
    node: Node,
    membership: Arc<dyn MembershipEffects>,
}

impl MembershipView {
    /// Create a view for `node`
    pub fn new(node: Node, membership: Arc<dyn MembershipEffects>) -> Self {
        Self { node, membership }
    }

    /// Local node identity
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Current topology including the local node
    pub async fn topology(&self) -> CairnResult<ClusterTopology> {
        let peers = self.membership.peers().await?;
        tracing::debug!(peers = peers.len(), "read peer membership");
        let topology =
            ClusterTopology::from_members(peers.into_iter().chain([self.node.as_member()]));
        Ok(topology)
    }
}

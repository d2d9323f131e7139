//! Static membership source

use async_trait::async_trait;
use cairn_core::effects::MembershipEffects;
use cairn_core::{CairnError, CairnResult, PeerMember};
use parking_lot::Mutex;

/// Membership source whose peer list tests set directly
#[derive(Debug, Default)]
pub struct StaticMembership {
    peers: Mutex<Vec<PeerMember>>,
    unavailable: Mutex<bool>,
}

impl StaticMembership {
    /// No peers
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `peers`
    pub fn with_peers(peers: Vec<PeerMember>) -> Self {
        Self {
            peers: Mutex::new(peers),
            unavailable: Mutex::new(false),
        }
    }

    /// Replace the peer list
    pub fn set_peers(&self, peers: Vec<PeerMember>) {
        *self.peers.lock() = peers;
    }

    /// Add one peer
    pub fn add_peer(&self, peer: PeerMember) {
        self.peers.lock().push(peer);
    }

    /// Make queries fail
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }
}

#[async_trait]
impl MembershipEffects for StaticMembership {
    async fn peers(&self) -> CairnResult<Vec<PeerMember>> {
        if *self.unavailable.lock() {
            return Err(CairnError::membership("membership source unavailable"));
        }
        Ok(self.peers.lock().clone())
    }
}

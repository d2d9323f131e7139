//! Peer-group membership source.

use async_trait::async_trait;

use crate::errors::CairnResult;
use crate::types::PeerMember;

/// Reports the remote members of the peer group.
///
/// The local node is not included; callers merge in their own [`crate::Node`].
/// Order of the returned list carries no meaning, `join_order` does.
#[async_trait]
pub trait MembershipEffects: Send + Sync {
    /// Current remote peers
    async fn peers(&self) -> CairnResult<Vec<PeerMember>>;
}

#[async_trait]
impl<T: MembershipEffects + ?Sized> MembershipEffects for std::sync::Arc<T> {
    async fn peers(&self) -> CairnResult<Vec<PeerMember>> {
        (**self).peers().await
    }
}

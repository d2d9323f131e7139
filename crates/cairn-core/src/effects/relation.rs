//! Consumer relation channel.

use async_trait::async_trait;

use crate::errors::CairnResult;
use crate::types::{ConsumerId, RelationId, RelationKind, RelationSettings};

/// Bidirectional key/value exchange with each consumer relation
#[async_trait]
pub trait RelationEffects: Send + Sync {
    /// Relations of one class currently established
    async fn relation_ids(&self, kind: RelationKind) -> CairnResult<Vec<RelationId>>;

    /// Settings written by the remote consumer
    async fn request(&self, relation: &RelationId) -> CairnResult<RelationSettings>;

    /// Identity of the remote consumer unit that triggered the event
    async fn remote_identity(&self, relation: &RelationId) -> CairnResult<Option<ConsumerId>>;

    /// Settings this node has published on the relation
    async fn published(&self, relation: &RelationId) -> CairnResult<RelationSettings>;

    /// Merge `settings` into this node's published settings
    async fn publish(&self, relation: &RelationId, settings: RelationSettings) -> CairnResult<()>;

    /// Remove everything this node published on the relation
    async fn clear(&self, relation: &RelationId) -> CairnResult<()>;
}

#[async_trait]
impl<T: RelationEffects + ?Sized> RelationEffects for std::sync::Arc<T> {
    async fn relation_ids(&self, kind: RelationKind) -> CairnResult<Vec<RelationId>> {
        (**self).relation_ids(kind).await
    }

    async fn request(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        (**self).request(relation).await
    }

    async fn remote_identity(&self, relation: &RelationId) -> CairnResult<Option<ConsumerId>> {
        (**self).remote_identity(relation).await
    }

    async fn published(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        (**self).published(relation).await
    }

    async fn publish(&self, relation: &RelationId, settings: RelationSettings) -> CairnResult<()> {
        (**self).publish(relation, settings).await
    }

    async fn clear(&self, relation: &RelationId) -> CairnResult<()> {
        (**self).clear(relation).await
    }
}

//! In-memory relation channel

use async_trait::async_trait;
use cairn_core::effects::RelationEffects;
use cairn_core::{CairnError, CairnResult, ConsumerId, RelationId, RelationKind, RelationSettings};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct RelationState {
    remote: Option<ConsumerId>,
    request: RelationSettings,
    published: RelationSettings,
    publishes: usize,
    clears: usize,
}

/// Relation channel holding every relation in memory
#[derive(Debug, Default)]
pub struct MemoryRelationChannel {
    relations: Mutex<BTreeMap<RelationId, RelationState>>,
}

impl MemoryRelationChannel {
    /// No relations
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish a relation with a remote consumer and its request settings
    pub fn add_relation(
        &self,
        id: RelationId,
        remote: Option<ConsumerId>,
        request: RelationSettings,
    ) {
        self.relations.lock().insert(
            id,
            RelationState {
                remote,
                request,
                ..RelationState::default()
            },
        );
    }

    /// Replace what the remote side has written
    pub fn set_request(&self, id: &RelationId, request: RelationSettings) {
        if let Some(state) = self.relations.lock().get_mut(id) {
            state.request = request;
        }
    }

    /// Pre-populate this node's published settings
    pub fn seed_published(&self, id: &RelationId, published: RelationSettings) {
        if let Some(state) = self.relations.lock().get_mut(id) {
            state.published = published;
        }
    }

    /// What this node currently publishes on `id`
    pub fn published_settings(&self, id: &RelationId) -> RelationSettings {
        self.relations
            .lock()
            .get(id)
            .map(|s| s.published.clone())
            .unwrap_or_default()
    }

    /// Number of publish calls on `id`
    pub fn publish_count(&self, id: &RelationId) -> usize {
        self.relations.lock().get(id).map_or(0, |s| s.publishes)
    }

    /// Number of clear calls on `id`
    pub fn clear_count(&self, id: &RelationId) -> usize {
        self.relations.lock().get(id).map_or(0, |s| s.clears)
    }

    fn with_relation<T>(
        &self,
        id: &RelationId,
        f: impl FnOnce(&mut RelationState) -> T,
    ) -> CairnResult<T> {
        let mut relations = self.relations.lock();
        let state = relations
            .get_mut(id)
            .ok_or_else(|| CairnError::relation(format!("no such relation: {id}")))?;
        Ok(f(state))
    }
}

#[async_trait]
impl RelationEffects for MemoryRelationChannel {
    async fn relation_ids(&self, kind: RelationKind) -> CairnResult<Vec<RelationId>> {
        Ok(self
            .relations
            .lock()
            .keys()
            .filter(|id| id.kind == kind)
            .cloned()
            .collect())
    }

    async fn request(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        self.with_relation(relation, |s| s.request.clone())
    }

    async fn remote_identity(&self, relation: &RelationId) -> CairnResult<Option<ConsumerId>> {
        self.with_relation(relation, |s| s.remote.clone())
    }

    async fn published(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        self.with_relation(relation, |s| s.published.clone())
    }

    async fn publish(&self, relation: &RelationId, settings: RelationSettings) -> CairnResult<()> {
        self.with_relation(relation, |s| {
            s.published.extend(settings);
            s.publishes += 1;
        })
    }

    async fn clear(&self, relation: &RelationId) -> CairnResult<()> {
        self.with_relation(relation, |s| {
            s.published.clear();
            s.clears += 1;
        })
    }
}

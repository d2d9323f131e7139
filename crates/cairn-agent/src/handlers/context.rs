//! JSON event context
//!
//! The orchestrator invoking `cairn hook` describes the world in one JSON
//! document: the local node, its peers, resource ownership and consumer
//! relation data. Handlers read from it and record their answers back into
//! it; the binary writes the document back after the hook runs.

use async_trait::async_trait;
use cairn_core::effects::{
    HaResourceSet, LeadershipState, MembershipEffects, RelationEffects, ResourceEffects,
    ResourceError,
};
use cairn_core::{
    CairnError, CairnResult, ConsumerId, Node, NodeAddress, PeerMember, RelationId, RelationKind,
    RelationSettings, ResourceId,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resource manager view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaState {
    /// Manager could not be queried
    pub unavailable: bool,
    /// Managed resources and their current owner
    pub owners: BTreeMap<String, Option<NodeAddress>>,
    /// Definitions handed over when the HA relation formed
    pub defined: Option<HaResourceSet>,
}

/// One consumer relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationState {
    /// Relation identifier
    pub id: RelationId,
    /// Remote unit that triggered the event
    #[serde(default)]
    pub remote: Option<ConsumerId>,
    /// Settings written by the consumer
    #[serde(default)]
    pub request: RelationSettings,
    /// Settings this node published
    #[serde(default)]
    pub published: RelationSettings,
}

/// Everything one hook invocation knows about the outside world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Local node
    pub local: Node,
    /// Remote peers
    #[serde(default)]
    pub peers: Vec<PeerMember>,
    /// Resource manager state
    #[serde(default)]
    pub ha: HaState,
    /// Consumer relations
    #[serde(default)]
    pub relations: Vec<RelationState>,
}

impl EventContext {
    /// Context for a lone node with nothing established
    pub fn new(local: Node) -> Self {
        Self {
            local,
            peers: Vec::new(),
            ha: HaState::default(),
            relations: Vec::new(),
        }
    }
}

/// File-backed [`EventContext`] implementing the membership, resource and
/// relation effects
#[derive(Debug)]
pub struct ContextFile {
    path: PathBuf,
    context: Mutex<EventContext>,
}

impl ContextFile {
    /// Read the context document at `path`
    pub async fn load(path: impl Into<PathBuf>) -> CairnResult<Self> {
        let path = path.into();
        let raw = tokio::fs::read(&path).await.map_err(|e| {
            CairnError::config(format!("failed to read context {}: {e}", path.display()))
        })?;
        let context = serde_json::from_slice(&raw).map_err(|e| {
            CairnError::config(format!("invalid context {}: {e}", path.display()))
        })?;
        Ok(Self::with_context(path, context))
    }

    /// Wrap an in-memory context that will be saved to `path`
    pub fn with_context(path: impl Into<PathBuf>, context: EventContext) -> Self {
        Self {
            path: path.into(),
            context: Mutex::new(context),
        }
    }

    /// Path the context is saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Local node recorded in the context
    pub fn local_node(&self) -> Node {
        self.context.lock().local.clone()
    }

    /// Copy of the current context
    pub fn snapshot(&self) -> EventContext {
        self.context.lock().clone()
    }

    /// Write the context, including any published answers, back to disk
    pub async fn save(&self) -> CairnResult<()> {
        let raw = serde_json::to_vec_pretty(&self.snapshot())?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    fn with_relation<R>(
        &self,
        relation: &RelationId,
        f: impl FnOnce(&mut RelationState) -> R,
    ) -> CairnResult<R> {
        let mut context = self.context.lock();
        let state = context
            .relations
            .iter_mut()
            .find(|r| &r.id == relation)
            .ok_or_else(|| CairnError::relation(format!("relation {relation} not established")))?;
        Ok(f(state))
    }
}

#[async_trait]
impl MembershipEffects for ContextFile {
    async fn peers(&self) -> CairnResult<Vec<PeerMember>> {
        let context = self.context.lock();
        Ok(context
            .peers
            .iter()
            .filter(|p| p.address != context.local.address)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceEffects for ContextFile {
    async fn leadership(&self, resource: &ResourceId) -> Result<LeadershipState, ResourceError> {
        let context = self.context.lock();
        if context.ha.unavailable {
            return Err(ResourceError::Unavailable {
                reason: "resource manager not responding".to_string(),
            });
        }
        Ok(match context.ha.owners.get(resource.as_str()) {
            Some(owner) => LeadershipState {
                resource: resource.clone(),
                managed: true,
                owner: owner.clone(),
            },
            None => LeadershipState::unmanaged(resource.clone()),
        })
    }

    async fn define_resources(&self, resources: &HaResourceSet) -> Result<(), ResourceError> {
        self.context.lock().ha.defined = Some(resources.clone());
        Ok(())
    }
}

#[async_trait]
impl RelationEffects for ContextFile {
    async fn relation_ids(&self, kind: RelationKind) -> CairnResult<Vec<RelationId>> {
        let context = self.context.lock();
        let mut ids: Vec<RelationId> = context
            .relations
            .iter()
            .filter(|r| r.id.kind == kind)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn request(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        self.with_relation(relation, |r| r.request.clone())
    }

    async fn remote_identity(&self, relation: &RelationId) -> CairnResult<Option<ConsumerId>> {
        self.with_relation(relation, |r| r.remote.clone())
    }

    async fn published(&self, relation: &RelationId) -> CairnResult<RelationSettings> {
        self.with_relation(relation, |r| r.published.clone())
    }

    async fn publish(&self, relation: &RelationId, settings: RelationSettings) -> CairnResult<()> {
        self.with_relation(relation, |r| r.published.extend(settings))
    }

    async fn clear(&self, relation: &RelationId) -> CairnResult<()> {
        self.with_relation(relation, |r| r.published.clear())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const DOCUMENT: &str = r#"{
        "local": { "address": "10.0.0.2", "join_order": 2 },
        "peers": [
            { "address": "10.0.0.1", "join_order": 1 },
            { "address": "10.0.0.2", "join_order": 2 }
        ],
        "ha": { "owners": { "res_mysql_vip": "10.0.0.2" } },
        "relations": [
            {
                "id": { "kind": "shared-db", "number": 3 },
                "request": { "database": "keystone" }
            }
        ]
    }"#;

    #[tokio::test]
    async fn reads_orchestrator_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(&path, DOCUMENT).unwrap();

        let ctx = ContextFile::load(&path).await.unwrap();
        assert_eq!(ctx.local_node().join_order, 2);
        assert_eq!(ctx.peers().await.unwrap(), vec![PeerMember::new("10.0.0.1", 1)]);

        let state = ctx
            .leadership(&ResourceId::new("res_mysql_vip"))
            .await
            .unwrap();
        assert!(state.managed);
        assert_eq!(state.owner, Some(NodeAddress::new("10.0.0.2")));

        let other = ctx.leadership(&ResourceId::new("res_other")).await.unwrap();
        assert!(!other.managed);

        let ids = ctx.relation_ids(RelationKind::SharedDb).await.unwrap();
        assert_eq!(ids, vec![RelationId::new(RelationKind::SharedDb, 3)]);
        assert!(ctx.relation_ids(RelationKind::Db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn published_answers_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(&path, DOCUMENT).unwrap();
        let id = RelationId::new(RelationKind::SharedDb, 3);

        let ctx = ContextFile::load(&path).await.unwrap();
        ctx.publish(&id, RelationSettings::from([("db_host".into(), "10.0.0.100".into())]))
            .await
            .unwrap();
        ctx.publish(&id, RelationSettings::from([("password".into(), "pw".into())]))
            .await
            .unwrap();
        ctx.save().await.unwrap();

        let reloaded = ContextFile::load(&path).await.unwrap();
        let published = reloaded.published(&id).await.unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published["db_host"], "10.0.0.100");

        reloaded.clear(&id).await.unwrap();
        assert!(reloaded.published(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextFile::with_context(
            dir.path().join("missing/context.json"),
            EventContext::new(Node::new("10.0.0.1", 1)),
        );
        assert!(matches!(
            ctx.save().await,
            Err(CairnError::Internal { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_relation_is_an_error() {
        let ctx = ContextFile::with_context(
            "unused.json",
            EventContext::new(Node::new("10.0.0.1", 1)),
        );
        let err = ctx
            .request(&RelationId::new(RelationKind::Db, 9))
            .await
            .unwrap_err();
        assert!(matches!(err, CairnError::Relation { .. }));
    }

    #[tokio::test]
    async fn unavailable_manager_is_reported() {
        let mut context = EventContext::new(Node::new("10.0.0.1", 1));
        context.ha.unavailable = true;
        let ctx = ContextFile::with_context("unused.json", context);
        assert!(ctx.leadership(&ResourceId::new("res_mysql_vip")).await.is_err());
    }
}

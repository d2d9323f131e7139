//! End-to-end event handling against in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::sync::Arc;

use assert_matches::assert_matches;
use cairn_agent::{ClusterAgent, Collaborators};
use cairn_cluster::{NodeState, ReconcileAction, APPLIED_FINGERPRINT_KEY, SEEDED_KEY};
use cairn_core::effects::RestartMode;
use cairn_core::{CairnError, Node, RelationId, RelationKind, ResourceId, ServiceConfig};
use cairn_relations::{BrokerOutcome, FailoverOutcome};
use cairn_testkit::{
    init_test_tracing, peer, settings, test_config, MemoryRelationChannel, MemoryStateStore,
    MockProvisioner, MockResourceManager, RecordingConfigSink, StaticMembership,
};

struct Harness {
    membership: Arc<StaticMembership>,
    resources: Arc<MockResourceManager>,
    sink: Arc<RecordingConfigSink>,
    relations: Arc<MemoryRelationChannel>,
    store: Arc<MemoryStateStore>,
    agent: ClusterAgent,
}

fn node(local: u8, config: ServiceConfig) -> Harness {
    init_test_tracing();
    let me = peer(local);
    let membership = Arc::new(StaticMembership::new());
    let resources = Arc::new(MockResourceManager::unmanaged());
    let sink = Arc::new(RecordingConfigSink::new());
    let relations = Arc::new(MemoryRelationChannel::new());
    let store = Arc::new(MemoryStateStore::new());
    let collaborators = Collaborators {
        membership: membership.clone(),
        resources: resources.clone(),
        sink: sink.clone(),
        provisioner: Arc::new(MockProvisioner::new()),
        relations: relations.clone(),
        store: store.clone(),
    };
    let agent = ClusterAgent::new(
        config,
        Node::new(me.address, me.join_order),
        collaborators,
    )
    .unwrap();
    Harness {
        membership,
        resources,
        sink,
        relations,
        store,
        agent,
    }
}

#[tokio::test]
async fn repeated_config_event_restarts_once() {
    let mut n = node(1, test_config());

    let first = n.agent.on_config_inputs_changed(test_config()).await.unwrap();
    assert_eq!(first.action, ReconcileAction::StandaloneRestart);
    let second = n.agent.on_config_inputs_changed(test_config()).await.unwrap();
    assert_eq!(second.action, ReconcileAction::None);

    assert_eq!(n.sink.restarts(), vec![RestartMode::Standalone]);
    assert_eq!(n.sink.apply_count(), 1);
}

#[tokio::test]
async fn changed_settings_are_reapplied() {
    let mut n = node(1, test_config());
    n.agent.on_config_inputs_changed(test_config()).await.unwrap();

    let mut tuned = test_config();
    tuned.max_connections = 500;
    let report = n.agent.on_config_inputs_changed(tuned).await.unwrap();
    assert_eq!(report.action, ReconcileAction::StandaloneRestart);
    assert!(n.sink.last_content().unwrap().contains("max_connections = 500"));
    assert_eq!(n.agent.config().max_connections, 500);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_anything_runs() {
    let mut n = node(1, test_config());
    let mut broken = test_config();
    broken.cluster_name = String::new();

    let err = n.agent.on_config_inputs_changed(broken).await.unwrap_err();
    assert_matches!(err, CairnError::Config { .. });
    assert_eq!(n.sink.apply_count(), 0);
    assert_eq!(n.agent.config().cluster_name, test_config().cluster_name);
}

#[tokio::test]
async fn joiner_bootstraps_when_peer_appears() {
    let n = node(2, test_config());
    n.agent.on_membership_changed().await.unwrap();
    assert_eq!(n.agent.node_state().await.unwrap(), NodeState::SingleNode);

    n.membership.add_peer(peer(1));
    let report = n.agent.on_membership_changed().await.unwrap();
    assert_eq!(report.action, ReconcileAction::BootstrapJoin);
    assert_eq!(report.state, NodeState::Clustered);
    assert!(n.store.get(SEEDED_KEY).is_some());
    assert!(n.store.get(APPLIED_FINGERPRINT_KEY).is_some());
    assert_eq!(
        n.sink.restarts(),
        vec![RestartMode::Standalone, RestartMode::BootstrapJoin]
    );
}

#[tokio::test]
async fn upgrade_with_nothing_changed_is_a_no_op() {
    let n = node(1, test_config());
    n.agent.on_membership_changed().await.unwrap();
    let report = n.agent.on_upgrade().await.unwrap();
    assert_eq!(report.action, ReconcileAction::None);
    assert_eq!(n.sink.apply_count(), 1);
}

#[tokio::test]
async fn rendered_config_does_not_apply() {
    let n = node(1, test_config());
    let rendered = n.agent.rendered_config().await.unwrap();
    assert!(String::from_utf8_lossy(rendered.content()).contains("wsrep_node_address = 10.0.0.1"));
    assert_eq!(n.sink.apply_count(), 0);
    assert_eq!(n.agent.node_state().await.unwrap(), NodeState::Unconfigured);
}

#[tokio::test]
async fn consumer_request_then_failover() {
    let n = node(1, test_config());
    n.membership.add_peer(peer(2));
    n.resources.set_owner(Some("10.0.0.1".into()));
    let id = RelationId::new(RelationKind::SharedDb, 1);
    n.relations.add_relation(
        id.clone(),
        None,
        settings([
            ("database", "keystone"),
            ("username", "keystone"),
            ("hostname", "10.0.1.5"),
        ]),
    );

    assert!(n.agent.is_leader().await);
    let outcome = n.agent.on_consumer_relation_request(&id).await.unwrap();
    assert_matches!(outcome, BrokerOutcome::Published { .. });
    assert_eq!(n.relations.published_settings(&id)["db_host"], "10.0.0.100");

    n.resources.set_owner(Some("10.0.0.2".into()));
    let outcome = n
        .agent
        .on_leadership_changed(&ResourceId::new("res_mysql_vip"))
        .await
        .unwrap();
    assert_matches!(outcome, FailoverOutcome::Scrubbed { .. });
    assert!(n.relations.published_settings(&id).is_empty());
    assert!(!n.agent.is_leader().await);
}

#[tokio::test]
async fn ha_join_defines_vip_resources() {
    let n = node(1, test_config());
    let set = n.agent.on_ha_relation_joined().await.unwrap();
    assert_eq!(n.resources.defined(), vec![set.clone()]);
    assert_eq!(set.groups["grp_cairn_cluster"], "res_mysql_vip");
}

#[tokio::test]
async fn ha_join_without_vip_is_a_config_error() {
    let mut config = test_config();
    config.vip_cidr = None;
    let n = node(1, config);
    let err = n.agent.on_ha_relation_joined().await.unwrap_err();
    assert_matches!(err, CairnError::Config { .. });
    assert!(n.resources.defined().is_empty());
}

#[tokio::test]
async fn reconcile_relations_answers_every_established_relation() {
    let n = node(1, test_config());
    let shared = RelationId::new(RelationKind::SharedDb, 1);
    let db = RelationId::new(RelationKind::Db, 2);
    n.relations.add_relation(
        shared.clone(),
        None,
        settings([
            ("database", "keystone"),
            ("username", "keystone"),
            ("hostname", "10.0.1.5"),
        ]),
    );
    n.relations.add_relation(
        db.clone(),
        Some(cairn_core::ConsumerId::parse("wordpress/0").unwrap()),
        settings([("private-address", "10.0.2.1")]),
    );

    let summary = n.agent.reconcile_relations().await.unwrap();
    assert_eq!(summary.outcomes.len(), 2);
    assert!(summary.errors.is_empty());
    assert_eq!(n.relations.published_settings(&shared)["db_host"], "10.0.0.1");
    assert_eq!(n.relations.published_settings(&db)["host"], "10.0.0.1");
}

//! Reconciliation scenarios against in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::sync::Arc;

use assert_matches::assert_matches;
use cairn_cluster::change::APPLIED_FINGERPRINT_KEY;
use cairn_cluster::seed::{JOIN_PENDING_KEY, SEEDED_KEY};
use cairn_cluster::{
    ClusterReconciler, ConfigChange, MembershipView, NodeState, ReconcileAction,
};
use cairn_core::effects::RestartMode;
use cairn_core::{BaseSettings, CairnError, Node, Secrets};
use cairn_testkit::{
    init_test_tracing, peer, test_secrets, MemoryStateStore, RecordingConfigSink,
    StaticMembership,
};

struct Harness {
    membership: Arc<StaticMembership>,
    store: Arc<MemoryStateStore>,
    sink: Arc<RecordingConfigSink>,
    reconciler: ClusterReconciler,
}

fn harness(local: u8) -> Harness {
    init_test_tracing();
    let node_member = peer(local);
    let node = Node::new(node_member.address, node_member.join_order);
    let membership = Arc::new(StaticMembership::new());
    let store = Arc::new(MemoryStateStore::new());
    let sink = Arc::new(RecordingConfigSink::new());
    let reconciler = ClusterReconciler::with_store(
        MembershipView::new(node, membership.clone()),
        store.clone(),
        sink.clone(),
    );
    Harness {
        membership,
        store,
        sink,
        reconciler,
    }
}

#[tokio::test]
async fn single_node_first_run_restarts_once() {
    let h = harness(1);
    let settings = BaseSettings::default();

    let first = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(first.change, ConfigChange::FirstRun);
    assert_eq!(first.action, ReconcileAction::StandaloneRestart);
    assert_eq!(first.state, NodeState::SingleNode);
    assert!(h.store.get(APPLIED_FINGERPRINT_KEY).is_some());

    let second = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(second.change, ConfigChange::Unchanged);
    assert_eq!(second.action, ReconcileAction::None);
    assert_eq!(h.sink.restarts(), vec![RestartMode::Standalone]);
    assert_eq!(h.sink.apply_count(), 1);
}

#[tokio::test]
async fn joiner_bootstraps_and_oldest_stays_up() {
    let a = harness(1);
    let b = harness(2);
    a.membership.set_peers(vec![peer(2)]);
    b.membership.set_peers(vec![peer(1)]);
    let settings = BaseSettings::default();

    let report_b = b.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report_b.action, ReconcileAction::BootstrapJoin);
    assert_eq!(report_b.state, NodeState::Clustered);
    assert_eq!(b.sink.restarts(), vec![RestartMode::BootstrapJoin]);
    assert!(b.reconciler.seed_state().is_seeded().await.unwrap());

    let report_a = a.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report_a.action, ReconcileAction::AppliedWithoutRestart);
    assert!(a.sink.restarts().is_empty());
    assert!(!a.reconciler.seed_state().is_seeded().await.unwrap());

    // Both render the same member list
    assert!(a
        .sink
        .last_content()
        .unwrap()
        .contains("gcomm://10.0.0.1,10.0.0.2\n"));
    assert!(b
        .sink
        .last_content()
        .unwrap()
        .contains("gcomm://10.0.0.1,10.0.0.2\n"));
}

#[tokio::test]
async fn seed_is_marked_at_most_once_across_membership_churn() {
    let h = harness(3);
    let settings = BaseSettings::default();

    // Alone first, then peers arrive and leave
    for peers in [
        vec![],
        vec![peer(1)],
        vec![peer(1), peer(2)],
        vec![peer(2)],
        vec![peer(2), peer(4)],
    ] {
        h.membership.set_peers(peers);
        h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    }

    assert_eq!(h.store.write_count(SEEDED_KEY), 1);
    assert_eq!(
        h.sink.restarts(),
        vec![RestartMode::Standalone, RestartMode::BootstrapJoin]
    );
}

#[tokio::test]
async fn apply_failure_keeps_fingerprint_and_retries() {
    let h = harness(1);
    let settings = BaseSettings::default();
    h.sink.fail_apply(true);

    let err = h
        .reconciler
        .reconcile(&test_secrets(), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Apply { .. });
    assert!(h.store.get(APPLIED_FINGERPRINT_KEY).is_none());
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::Unconfigured);

    h.sink.fail_apply(false);
    let report = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report.change, ConfigChange::FirstRun);
    assert_eq!(report.action, ReconcileAction::StandaloneRestart);
}

#[tokio::test]
async fn restart_failure_never_marks_seeded() {
    let h = harness(2);
    h.membership.set_peers(vec![peer(1)]);
    let settings = BaseSettings::default();
    h.sink.fail_restart(true);

    let err = h
        .reconciler
        .reconcile(&test_secrets(), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Restart { .. });
    assert!(!h.reconciler.seed_state().is_seeded().await.unwrap());
    assert!(h.store.get(APPLIED_FINGERPRINT_KEY).is_none());
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::Unconfigured);
    assert!(h.store.get(JOIN_PENDING_KEY).is_none());

    h.sink.fail_restart(false);
    let report = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report.action, ReconcileAction::BootstrapJoin);
    assert!(h.reconciler.seed_state().is_seeded().await.unwrap());
}

#[tokio::test]
async fn unwritable_store_refuses_join_restart() {
    let h = harness(2);
    h.membership.set_peers(vec![peer(1)]);
    let settings = BaseSettings::default();
    h.store.fail_writes(true);

    let err = h
        .reconciler
        .reconcile(&test_secrets(), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Storage { .. });
    assert!(h.sink.restarts().is_empty());

    h.store.fail_writes(false);
    let report = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report.action, ReconcileAction::BootstrapJoin);
    assert_eq!(h.sink.restarts(), vec![RestartMode::BootstrapJoin]);
}

#[tokio::test]
async fn lost_seed_record_never_repeats_join_restart() {
    let h = harness(2);
    h.membership.set_peers(vec![peer(1)]);
    let settings = BaseSettings::default();
    h.store.fail_key(SEEDED_KEY);

    let err = h
        .reconciler
        .reconcile(&test_secrets(), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Storage { .. });
    assert_eq!(h.sink.restarts(), vec![RestartMode::BootstrapJoin]);
    assert!(h.store.get(JOIN_PENDING_KEY).is_some());
    assert!(h.store.get(APPLIED_FINGERPRINT_KEY).is_none());

    h.store.heal_key(SEEDED_KEY);
    let report = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report.action, ReconcileAction::AppliedWithoutRestart);
    assert_eq!(report.state, NodeState::Clustered);
    assert_eq!(h.sink.restarts(), vec![RestartMode::BootstrapJoin]);
    assert!(h.reconciler.seed_state().is_seeded().await.unwrap());
    assert!(h.store.get(JOIN_PENDING_KEY).is_none());
}

#[tokio::test]
async fn fingerprint_commit_failure_reapplies_next_pass() {
    let h = harness(1);
    let settings = BaseSettings::default();
    h.store.fail_key(APPLIED_FINGERPRINT_KEY);

    let err = h
        .reconciler
        .reconcile(&test_secrets(), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Storage { .. });
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::Unconfigured);

    h.store.heal_key(APPLIED_FINGERPRINT_KEY);
    let report = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(report.change, ConfigChange::FirstRun);
    assert_eq!(report.action, ReconcileAction::StandaloneRestart);
    assert_eq!(h.store.write_count(APPLIED_FINGERPRINT_KEY), 1);

    let settled = h.reconciler.reconcile(&test_secrets(), &settings).await.unwrap();
    assert_eq!(settled.action, ReconcileAction::None);
}

#[tokio::test]
async fn missing_secret_aborts_before_any_side_effect() {
    let h = harness(1);
    let err = h
        .reconciler
        .reconcile(&Secrets::default(), &BaseSettings::default())
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Config { .. });
    assert!(h.sink.calls().is_empty());
    assert!(h.store.get(APPLIED_FINGERPRINT_KEY).is_none());
}

#[tokio::test]
async fn settings_change_on_seeded_member_applies_without_restart() {
    let h = harness(2);
    h.membership.set_peers(vec![peer(1)]);
    h.reconciler
        .reconcile(&test_secrets(), &BaseSettings::default())
        .await
        .unwrap();

    let tuned = BaseSettings {
        max_connections: Some(800),
        ..BaseSettings::default()
    };
    let report = h.reconciler.reconcile(&test_secrets(), &tuned).await.unwrap();
    assert_eq!(report.change, ConfigChange::Changed);
    assert_eq!(report.action, ReconcileAction::AppliedWithoutRestart);
    assert_eq!(h.sink.restarts(), vec![RestartMode::BootstrapJoin]);
    assert_eq!(h.sink.apply_count(), 2);
}

#[tokio::test]
async fn node_state_tracks_lifecycle() {
    let h = harness(2);
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::Unconfigured);

    h.reconciler
        .reconcile(&test_secrets(), &BaseSettings::default())
        .await
        .unwrap();
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::SingleNode);

    h.membership.set_peers(vec![peer(1)]);
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::AwaitingSeed);

    h.reconciler
        .reconcile(&test_secrets(), &BaseSettings::default())
        .await
        .unwrap();
    assert_eq!(h.reconciler.node_state().await.unwrap(), NodeState::Clustered);
}

#[tokio::test]
async fn membership_failure_is_surfaced() {
    let h = harness(1);
    h.membership.set_unavailable(true);
    let err = h
        .reconciler
        .reconcile(&test_secrets(), &BaseSettings::default())
        .await
        .unwrap_err();
    assert_matches!(err, CairnError::Membership { .. });
}

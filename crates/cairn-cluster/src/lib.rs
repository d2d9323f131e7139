//! Cairn cluster reconciliation
//!
//! Decides, per node and per event, whether the database service needs a
//! standalone restart, a one-time bootstrap-join, or nothing at all.
//!
//! - [`membership`]: topology snapshots ordered by join time
//! - [`render`]: deterministic configuration rendering
//! - [`change`]: fingerprint comparison and the applied-fingerprint ledger
//! - [`seed`]: the monotonic bootstrap marker
//! - [`reconciler`]: the state machine tying them together
//! - [`vip`]: floating address resource definitions

#![forbid(unsafe_code)]

pub mod change;
pub mod membership;
pub mod reconciler;
pub mod render;
pub mod seed;
pub mod vip;

pub use change::{AppliedFingerprint, ChangeDetector, ConfigChange, APPLIED_FINGERPRINT_KEY};
pub use membership::{ClusterTopology, MembershipView};
pub use reconciler::{
    decide_action, ClusterReconciler, NodeState, ReconcileAction, ReconcileReport,
};
pub use render::{ConfigRenderer, RenderInputs};
pub use seed::{SeedState, JOIN_PENDING_KEY, SEEDED_KEY};
pub use vip::{define_vip_resources, ha_resources};

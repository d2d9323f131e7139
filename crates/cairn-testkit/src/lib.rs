//! Cairn testing infrastructure
//!
//! In-memory implementations of every collaborator trait in
//! `cairn_core::effects`. Each one records what was asked of it so tests can
//! assert on restarts, seed marks, publishes and clears.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cairn_testkit::*;
//!
//! let store = Arc::new(MemoryStateStore::new());
//! let sink = Arc::new(RecordingConfigSink::new());
//! let membership = Arc::new(StaticMembership::new());
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod membership;
pub mod provisioning;
pub mod relations;
pub mod resources;
pub mod sink;
pub mod storage;

pub use fixtures::*;
pub use membership::StaticMembership;
pub use provisioning::MockProvisioner;
pub use relations::MemoryRelationChannel;
pub use resources::MockResourceManager;
pub use sink::{RecordingConfigSink, SinkCall};
pub use storage::MemoryStateStore;

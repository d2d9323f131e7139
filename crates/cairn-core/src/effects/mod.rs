//! Collaborator effect traits
//!
//! Pure trait definitions for every side effect a cairn node performs. This
//! module defines **what** a collaborator offers; handlers in `cairn-agent`
//! (production) and `cairn-testkit` (in-memory) define **how**.
//!
//! - **Membership**: peer addresses with a stable join order
//! - **Resource**: floating-resource ownership and resource definitions
//! - **Sink**: apply rendered configuration, restart the service
//! - **Provisioning**: create databases and grants, return credentials
//! - **Relation**: per-consumer key/value channel
//! - **Storage**: small persisted node state (SeedState, applied fingerprint)

pub mod membership;
pub mod provisioning;
pub mod relation;
pub mod resource;
pub mod sink;
pub mod storage;

pub use membership::MembershipEffects;
pub use provisioning::{GrantRequest, ProvisionError, ProvisioningEffects};
pub use relation::RelationEffects;
pub use resource::{HaResourceSet, LeadershipState, ResourceEffects, ResourceError};
pub use sink::{ConfigSinkEffects, RestartMode, SinkError};
pub use storage::{StateStoreEffects, StorageError};

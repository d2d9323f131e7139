//! Production collaborators
//!
//! Each handler implements one effect trait from `cairn_core::effects` against
//! the real host: the filesystem, systemd, an external provisioning command
//! and the JSON event context written by the orchestrator.

pub mod config_sink;
pub mod context;
pub mod provisioner;
pub mod state_store;

pub use config_sink::FileConfigSink;
pub use context::{ContextFile, EventContext, HaState, RelationState};
pub use provisioner::{CommandProvisioner, DisabledProvisioner};
pub use state_store::FilesystemStateStore;

//! # Cairn Agent
//!
//! Per-node event handlers for a replicated database cluster plus the
//! production collaborators the `cairn` binary wires them to.
//!
//! [`ClusterAgent`] owns one node's view: it renders and applies cluster
//! configuration when membership or settings change, answers consumer
//! database requests while this node holds the floating address, and pushes
//! or scrubs connection settings when leadership moves.

#![forbid(unsafe_code)]

pub mod agent;
pub mod handlers;
pub mod hooks;

pub use agent::{ClusterAgent, Collaborators};
pub use hooks::{dispatch, Hook, HookArgs, UnregisteredHook};

use std::sync::Arc;

use cairn_core::effects::ProvisioningEffects;
use cairn_core::{CairnResult, ServiceConfig};
use handlers::{
    CommandProvisioner, ContextFile, DisabledProvisioner, FileConfigSink, FilesystemStateStore,
};

/// Wire production collaborators around an event context
pub fn production_collaborators(
    config: &ServiceConfig,
    context: Arc<ContextFile>,
) -> CairnResult<Collaborators> {
    let provisioner: Arc<dyn ProvisioningEffects> = match config.provision_command.as_deref() {
        Some(command) => Arc::new(CommandProvisioner::from_command_line(command)?),
        None => {
            tracing::warn!("no provision command configured, consumer requests will fail");
            Arc::new(DisabledProvisioner)
        }
    };
    Ok(Collaborators {
        membership: context.clone(),
        resources: context.clone(),
        relations: context,
        sink: Arc::new(FileConfigSink::new(
            &config.config_path,
            &config.service_name,
        )),
        provisioner,
        store: Arc::new(FilesystemStateStore::new(&config.state_dir)),
    })
}

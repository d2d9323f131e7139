//! Cairn core: shared vocabulary for replicated-database cluster coordination
//!
//! A cairn node decides, without a central coordinator, which node bootstraps
//! a new cluster, when a configuration change calls for a restart, and which
//! node answers consumers on behalf of the floating address. This crate holds
//! the pieces every other cairn crate agrees on:
//!
//! - [`types`]: node, peer, resource and relation identifiers, fingerprints
//! - [`errors`]: the unified [`CairnError`] taxonomy
//! - [`effects`]: async traits for every external collaborator
//! - [`config`]: the service configuration file and its validation
//!
//! Nothing here performs I/O except [`ServiceConfig::load_from_file`].

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod types;

pub use config::{BaseSettings, DatasetSize, Secrets, ServiceConfig, VipSettings};
pub use errors::{CairnError, CairnResult};
pub use types::{
    ConsumerId, Fingerprint, Node, NodeAddress, Password, PeerMember, RelationId, RelationKind,
    RelationSettings, RenderedConfig, ResourceId,
};

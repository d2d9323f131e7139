//! Cairn consumer relations
//!
//! Leadership decides who speaks for the service: the [`RelationBroker`]
//! answers consumer requests only on the leader, and the
//! [`FailoverNotifier`] moves the floating address between nodes' published
//! settings when leadership changes.

#![forbid(unsafe_code)]

pub mod broker;
pub mod failover;
pub mod leader;
pub mod request;

pub use broker::{BrokerOutcome, BrokerSummary, RelationBroker};
pub use failover::{FailoverNotifier, FailoverOutcome};
pub use leader::{LeaderElector, Leadership};
pub use request::{BatchRequest, DatabaseRequest, SingleRequest};

//! Domain identifiers and value types shared by every cairn crate.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{CairnError, CairnResult};

/// Flat key/value payload exchanged over a consumer relation.
///
/// Ordered so that anything derived from it (publish calls, logs) is stable.
pub type RelationSettings = BTreeMap<String, String>;

/// Stable network address identifying a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    /// Wrap an address string
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Borrow the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One member of the peer group as reported by the membership source.
///
/// `join_order` is assigned by the membership collaborator and increases with
/// join time, so every node observing the same data derives the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerMember {
    /// Peer address
    pub address: NodeAddress,
    /// Monotonic join position
    pub join_order: u64,
}

impl PeerMember {
    /// Create a peer record
    pub fn new(address: impl Into<NodeAddress>, join_order: u64) -> Self {
        Self {
            address: address.into(),
            join_order,
        }
    }
}

/// Identity of the local node, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Local address
    pub address: NodeAddress,
    /// Local join position within the peer group
    pub join_order: u64,
}

impl Node {
    /// Create the local node identity
    pub fn new(address: impl Into<NodeAddress>, join_order: u64) -> Self {
        Self {
            address: address.into(),
            join_order,
        }
    }

    /// This node viewed as a member of the peer group
    pub fn as_member(&self) -> PeerMember {
        PeerMember {
            address: self.address.clone(),
            join_order: self.join_order,
        }
    }
}

/// Name of a floating resource held by the cluster-resource manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap a resource name
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the resource name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classes of consumer relation the broker answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// Multi-database requests keyed by explicit database/username/hostname
    SharedDb,
    /// Single database named after the consumer
    Db,
    /// Like `Db` but with administrative grants
    DbAdmin,
}

impl RelationKind {
    /// Every consumer relation class, in notification order
    pub const ALL: [RelationKind; 3] = [Self::SharedDb, Self::Db, Self::DbAdmin];

    /// Interface name used in relation ids and hook names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SharedDb => "shared-db",
            Self::Db => "db",
            Self::DbAdmin => "db-admin",
        }
    }

    /// Settings key carrying the database host for this class
    pub fn host_key(&self) -> &'static str {
        match self {
            Self::SharedDb => "db_host",
            Self::Db | Self::DbAdmin => "host",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = CairnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared-db" => Ok(Self::SharedDb),
            "db" => Ok(Self::Db),
            "db-admin" => Ok(Self::DbAdmin),
            other => Err(CairnError::relation(format!(
                "unknown relation kind: {other}"
            ))),
        }
    }
}

/// Identifier of one consumer relation, e.g. `shared-db:7`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId {
    /// Relation class
    pub kind: RelationKind,
    /// Relation number assigned by the relation channel
    pub number: u32,
}

impl RelationId {
    /// Create a relation id
    pub fn new(kind: RelationKind, number: u32) -> Self {
        Self { kind, number }
    }

    /// Parse the `kind:number` form
    pub fn parse(s: &str) -> CairnResult<Self> {
        let (kind, number) = s
            .rsplit_once(':')
            .ok_or_else(|| CairnError::relation(format!("malformed relation id: {s}")))?;
        let number = number
            .parse()
            .map_err(|_| CairnError::relation(format!("malformed relation number: {s}")))?;
        Ok(Self::new(kind.parse()?, number))
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.number)
    }
}

/// Identity of a remote consumer unit, `service/unit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerId {
    /// Consumer service name
    pub service: String,
    /// Unit number within the service
    pub unit: u32,
}

impl ConsumerId {
    /// Parse `service/unit`
    pub fn parse(s: &str) -> CairnResult<Self> {
        let (service, unit) = s
            .split_once('/')
            .ok_or_else(|| CairnError::relation(format!("malformed consumer identity: {s}")))?;
        if service.is_empty() {
            return Err(CairnError::relation(format!(
                "consumer identity has no service: {s}"
            )));
        }
        let unit = unit
            .parse()
            .map_err(|_| CairnError::relation(format!("malformed consumer unit: {s}")))?;
        Ok(Self {
            service: service.to_string(),
            unit,
        })
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.unit)
    }
}

/// A provisioned credential. Debug output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wrap a password
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Expose the secret for publishing
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when no password was supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// SHA-256 digest of rendered configuration bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint exactly these bytes
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a hex-encoded fingerprint
    pub fn from_hex(s: &str) -> CairnResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CairnError::storage(format!("corrupt fingerprint: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CairnError::storage("corrupt fingerprint: wrong length"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..12])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Rendered database configuration and the fingerprint of its exact bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    content: Vec<u8>,
    fingerprint: Fingerprint,
}

impl RenderedConfig {
    /// Wrap rendered bytes, fingerprinting them
    pub fn new(content: Vec<u8>) -> Self {
        let fingerprint = Fingerprint::of(&content);
        Self {
            content,
            fingerprint,
        }
    }

    /// Rendered bytes
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Fingerprint of [`Self::content`]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_id_round_trips_through_display() {
        let id = RelationId::parse("db-admin:12").unwrap();
        assert_eq!(id, RelationId::new(RelationKind::DbAdmin, 12));
        assert_eq!(id.to_string(), "db-admin:12");
    }

    #[test]
    fn relation_id_rejects_unknown_kind() {
        assert!(RelationId::parse("ha:1").is_err());
        assert!(RelationId::parse("shared-db").is_err());
    }

    #[test]
    fn consumer_id_splits_service_and_unit() {
        let id = ConsumerId::parse("keystone/3").unwrap();
        assert_eq!(id.service, "keystone");
        assert_eq!(id.unit, 3);
        assert!(ConsumerId::parse("/3").is_err());
        assert!(ConsumerId::parse("keystone").is_err());
    }

    #[test]
    fn fingerprint_tracks_exact_bytes() {
        let a = Fingerprint::of(b"wsrep_cluster_address = gcomm://\n");
        let b = Fingerprint::of(b"wsrep_cluster_address = gcomm:// \n");
        assert_ne!(a, b);
        assert_eq!(Fingerprint::from_hex(&a.to_hex()).unwrap(), a);
    }

    #[test]
    fn password_debug_is_redacted() {
        let password = Password::new("hunter2");
        assert!(!format!("{password:?}").contains("hunter2"));
    }
}

//! Consumer request parsing
//!
//! Relation payloads arrive as flat key/value maps. They are parsed once, at
//! the boundary, into a typed request:
//!
//! - `database`, `username`, `hostname` present: a [`SingleRequest`]
//! - otherwise keys are grouped by the text before the first `_`
//!   (`nova_database`, `nova_username`, `nova_hostname`) into a
//!   [`BatchRequest`]; only complete groups become requests

use std::collections::BTreeMap;

use cairn_core::effects::GrantRequest;
use cairn_core::{ConsumerId, RelationSettings};

const DATABASE: &str = "database";
const USERNAME: &str = "username";
const HOSTNAME: &str = "hostname";

/// Settings key the remote side writes its own address under.
pub const PRIVATE_ADDRESS: &str = "private-address";

/// One database, user and client host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SingleRequest {
    /// Database to create
    pub database: String,
    /// User to grant
    pub username: String,
    /// Host the consumer connects from
    pub hostname: String,
}

impl SingleRequest {
    fn from_fields(fields: &BTreeMap<&str, &str>) -> Option<Self> {
        Some(Self {
            database: fields.get(DATABASE)?.to_string(),
            username: fields.get(USERNAME)?.to_string(),
            hostname: fields.get(HOSTNAME)?.to_string(),
        })
    }

    /// Request named after the consumer service, as used by db relations.
    ///
    /// The same consumer always maps to the same database and user.
    pub fn for_consumer(consumer: &ConsumerId, hostname: impl Into<String>) -> Self {
        Self {
            database: consumer.service.clone(),
            username: consumer.service.clone(),
            hostname: hostname.into(),
        }
    }

    /// Grant to hand to the provisioner
    pub fn grant(&self, admin: bool) -> GrantRequest {
        GrantRequest {
            hostname: self.hostname.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            admin,
        }
    }
}

/// Independent requests keyed by prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    /// Complete requests by prefix
    pub requests: BTreeMap<String, SingleRequest>,
}

impl BatchRequest {
    /// True when no prefix carried a complete request
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Parsed shared-db payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseRequest {
    /// One unprefixed request
    Single(SingleRequest),
    /// Prefixed requests
    Batch(BatchRequest),
}

impl DatabaseRequest {
    /// Parse a raw relation payload
    pub fn parse(settings: &RelationSettings) -> Self {
        let flat: BTreeMap<&str, &str> = settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(single) = SingleRequest::from_fields(&flat) {
            return Self::Single(single);
        }

        let mut groups: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
        for (key, value) in settings {
            if let Some((prefix, field)) = key.split_once('_') {
                groups
                    .entry(prefix)
                    .or_default()
                    .insert(field, value.as_str());
            }
        }

        let requests = groups
            .into_iter()
            .filter_map(|(prefix, fields)| {
                let request = SingleRequest::from_fields(&fields);
                if request.is_none() {
                    tracing::debug!(prefix, "incomplete database request, skipping");
                }
                request.map(|r| (prefix.to_string(), r))
            })
            .collect();
        Self::Batch(BatchRequest { requests })
    }
}

/// Settings key carrying the password for a batch prefix
pub fn password_key(prefix: &str) -> String {
    format!("{prefix}_password")
}

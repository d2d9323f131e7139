//! Unified error type for cairn coordination
//!
//! Every reconciliation pass fails with one `CairnError`. The variant tells the
//! caller what happened to persisted state: `Config`, `Apply` and `Restart`
//! leave the stored fingerprint and SeedState untouched so the next event
//! retries the whole decision tree.

use serde::{Deserialize, Serialize};

/// Unified error type for all cairn operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CairnError {
    /// Missing or invalid inputs; the pass is abandoned before any state changes
    #[error("Config error: {message}")]
    Config {
        /// What was missing or invalid
        message: String,
    },

    /// The configuration sink rejected the rendered configuration
    #[error("Apply error: {message}")]
    Apply {
        /// Sink failure description
        message: String,
    },

    /// The database service did not come back after a restart
    #[error("Restart error: {message}")]
    Restart {
        /// Restart failure description
        message: String,
    },

    /// Ownership of a floating resource could not be determined
    #[error("Leadership unknown for {resource}: {reason}")]
    LeadershipUnknown {
        /// Resource whose owner was queried
        resource: String,
        /// Why the query failed
        reason: String,
    },

    /// Credential provisioning failed for one consumer
    #[error("Provision error on {relation}: {message}")]
    Provision {
        /// Relation the grant was requested on
        relation: String,
        /// Provisioner failure description
        message: String,
    },

    /// Reading or writing consumer relation data failed
    #[error("Relation error: {message}")]
    Relation {
        /// Relation channel failure description
        message: String,
    },

    /// Peer membership data could not be read
    #[error("Membership error: {message}")]
    Membership {
        /// Membership source failure description
        message: String,
    },

    /// Local persisted state could not be read or written
    #[error("Storage error: {message}")]
    Storage {
        /// Storage failure description
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl CairnError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an apply error
    pub fn apply(message: impl Into<String>) -> Self {
        Self::Apply {
            message: message.into(),
        }
    }

    /// Create a restart error
    pub fn restart(message: impl Into<String>) -> Self {
        Self::Restart {
            message: message.into(),
        }
    }

    /// Create a leadership-unknown error
    pub fn leadership_unknown(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LeadershipUnknown {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a provisioning error scoped to one relation
    pub fn provision(relation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provision {
            relation: relation.into(),
            message: message.into(),
        }
    }

    /// Create a relation channel error
    pub fn relation(message: impl Into<String>) -> Self {
        Self::Relation {
            message: message.into(),
        }
    }

    /// Create a membership error
    pub fn membership(message: impl Into<String>) -> Self {
        Self::Membership {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for cairn operations
pub type CairnResult<T> = std::result::Result<T, CairnError>;

impl From<std::io::Error> for CairnError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for CairnError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("invalid JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CairnError::config("vip is not set");
        assert_eq!(err.to_string(), "Config error: vip is not set");

        let err = CairnError::provision("shared-db:4", "grant refused");
        assert_eq!(err.to_string(), "Provision error on shared-db:4: grant refused");
    }

    #[test]
    fn io_failures_are_internal() {
        let err: CairnError = std::io::Error::other("disk gone").into();
        assert!(matches!(err, CairnError::Internal { .. }));
    }
}

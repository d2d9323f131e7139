//! Common fixtures

use cairn_core::{PeerMember, RelationSettings, Secrets, ServiceConfig};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process; honours `RUST_LOG`
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Secrets with both passwords set
pub fn test_secrets() -> Secrets {
    Secrets {
        root_password: Some("root-pw".to_string()),
        sst_password: Some("sst-pw".to_string()),
    }
}

/// Service configuration with secrets and a complete VIP definition
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        root_password: Some("root-pw".to_string()),
        sst_password: Some("sst-pw".to_string()),
        vip: Some("10.0.0.100".to_string()),
        vip_cidr: Some(24),
        vip_iface: Some("eth0".to_string()),
        ..ServiceConfig::default()
    }
}

/// Peer at `10.0.0.<n>` with join order `n`
pub fn peer(n: u8) -> PeerMember {
    PeerMember::new(format!("10.0.0.{n}").as_str(), u64::from(n))
}

/// Build relation settings from pairs
pub fn settings<const N: usize>(pairs: [(&str, &str); N]) -> RelationSettings {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

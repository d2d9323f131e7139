//! Service configuration for a cairn node
//!
//! Configuration is read from a TOML or JSON file, overlaid with `CAIRN_*`
//! environment variables, then validated. The reconciler never reads this
//! struct directly; callers split it into [`Secrets`] and [`BaseSettings`] and
//! pass those explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{CairnError, CairnResult};
use crate::types::ResourceId;

/// Prefix for environment overrides, e.g. `CAIRN_SST_PASSWORD`.
pub const ENV_PREFIX: &str = "CAIRN_";

/// Full configuration surface of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Cluster name rendered into the database configuration
    pub cluster_name: String,
    /// Database root password
    pub root_password: Option<String>,
    /// Password of the state-transfer user
    pub sst_password: Option<String>,
    /// Floating address exposed to consumers
    pub vip: Option<String>,
    /// Interface the floating address is bound to
    pub vip_iface: Option<String>,
    /// Netmask length of the floating address
    pub vip_cidr: Option<u8>,
    /// Interface the resource manager binds its ring to
    pub ha_bindiface: String,
    /// Multicast port of the resource manager ring
    pub ha_mcastport: u16,
    /// Maximum client connections; negative leaves the server default
    pub max_connections: i64,
    /// Working-set size: bytes with optional K/M/G/T suffix, or `NN%` of memory
    pub dataset_size: Option<String>,
    /// Physical memory of the host, required for percentage dataset sizes
    pub host_memory_bytes: Option<u64>,
    /// Extra `key = value` options appended to the rendered configuration
    pub extra_options: BTreeMap<String, String>,
    /// Resource whose owner answers consumers
    pub leader_resource: String,
    /// Resource group holding the leader resource
    pub resource_group: String,
    /// Service restarted when configuration changes
    pub service_name: String,
    /// Directory for SeedState and the applied fingerprint
    pub state_dir: PathBuf,
    /// Path the rendered configuration is written to
    pub config_path: PathBuf,
    /// Command invoked to provision database credentials
    pub provision_command: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cluster_name: "cairn_cluster".to_string(),
            root_password: None,
            sst_password: None,
            vip: None,
            vip_iface: None,
            vip_cidr: None,
            ha_bindiface: "eth0".to_string(),
            ha_mcastport: 5490,
            max_connections: -1,
            dataset_size: None,
            host_memory_bytes: None,
            extra_options: BTreeMap::new(),
            leader_resource: "res_mysql_vip".to_string(),
            resource_group: "grp_cairn_cluster".to_string(),
            service_name: "mysql".to_string(),
            state_dir: PathBuf::from("/var/lib/cairn"),
            config_path: PathBuf::from("/etc/mysql/my.cnf"),
            provision_command: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file(path: &Path) -> CairnResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CairnError::config(format!("failed to read {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| CairnError::config(format!("invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CairnError::config(format!("invalid JSON: {e}"))),
            _ => Err(CairnError::config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Overlay values from `CAIRN_*` environment variables
    pub fn merge_with_env(&mut self) -> CairnResult<()> {
        let vars: Vec<(String, String)> = std::env::vars()
            .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|k| (k.to_lowercase(), v)))
            .collect();
        for (key, value) in vars {
            match self.set_from_string(&key, &value) {
                Ok(()) => {}
                // Unrelated CAIRN_* variables (e.g. CAIRN_LOG) are not config keys
                Err(CairnError::Config { message }) if message.starts_with("unknown key") => {
                    tracing::debug!(key = %key, "ignoring unrelated environment variable");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Set a single value by key name
    pub fn set_from_string(&mut self, key: &str, value: &str) -> CairnResult<()> {
        let key = key.replace('-', "_");
        match key.as_str() {
            "cluster_name" => self.cluster_name = value.to_string(),
            "root_password" => self.root_password = Some(value.to_string()),
            "sst_password" => self.sst_password = Some(value.to_string()),
            "vip" => self.vip = Some(value.to_string()),
            "vip_iface" => self.vip_iface = Some(value.to_string()),
            "vip_cidr" => {
                self.vip_cidr = Some(
                    value
                        .parse()
                        .map_err(|_| CairnError::config("vip_cidr must be 0-255"))?,
                );
            }
            "ha_bindiface" => self.ha_bindiface = value.to_string(),
            "ha_mcastport" => {
                self.ha_mcastport = value
                    .parse()
                    .map_err(|_| CairnError::config("ha_mcastport must be a port number"))?;
            }
            "max_connections" => {
                self.max_connections = value
                    .parse()
                    .map_err(|_| CairnError::config("max_connections must be an integer"))?;
            }
            "dataset_size" => self.dataset_size = Some(value.to_string()),
            "host_memory_bytes" => {
                self.host_memory_bytes = Some(
                    value
                        .parse()
                        .map_err(|_| CairnError::config("host_memory_bytes must be an integer"))?,
                );
            }
            "leader_resource" => self.leader_resource = value.to_string(),
            "resource_group" => self.resource_group = value.to_string(),
            "service_name" => self.service_name = value.to_string(),
            "state_dir" => self.state_dir = PathBuf::from(value),
            "config_path" => self.config_path = PathBuf::from(value),
            "provision_command" => self.provision_command = Some(value.to_string()),
            other => return Err(CairnError::config(format!("unknown key: {other}"))),
        }
        Ok(())
    }

    /// Check internal consistency; does not require secrets to be present
    pub fn validate(&self) -> CairnResult<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(CairnError::config("cluster_name cannot be empty"));
        }
        if self.leader_resource.trim().is_empty() {
            return Err(CairnError::config("leader_resource cannot be empty"));
        }
        if self.service_name.trim().is_empty() {
            return Err(CairnError::config("service_name cannot be empty"));
        }
        if let Some(cidr) = self.vip_cidr {
            if cidr > 32 {
                return Err(CairnError::config(format!("vip_cidr out of range: {cidr}")));
            }
        }
        if let Some(size) = &self.dataset_size {
            let size = DatasetSize::parse(size)?;
            if matches!(size, DatasetSize::Percent(_)) && self.host_memory_bytes.is_none() {
                return Err(CairnError::config(
                    "percentage dataset_size requires host_memory_bytes",
                ));
            }
        }
        Ok(())
    }

    /// Secrets rendered into or used alongside the database configuration
    pub fn secrets(&self) -> Secrets {
        Secrets {
            root_password: self.root_password.clone(),
            sst_password: self.sst_password.clone(),
        }
    }

    /// Static settings feeding the renderer
    pub fn base_settings(&self) -> CairnResult<BaseSettings> {
        Ok(BaseSettings {
            cluster_name: self.cluster_name.clone(),
            max_connections: u32::try_from(self.max_connections).ok(),
            dataset_size: self
                .dataset_size
                .as_deref()
                .map(DatasetSize::parse)
                .transpose()?,
            host_memory_bytes: self.host_memory_bytes,
            extra_options: self.extra_options.clone(),
        })
    }

    /// Leader resource as a typed id
    pub fn leader_resource_id(&self) -> ResourceId {
        ResourceId::new(self.leader_resource.clone())
    }

    /// Floating-address settings, all three of address, netmask and interface
    pub fn vip_settings(&self) -> CairnResult<VipSettings> {
        match (&self.vip, self.vip_cidr, &self.vip_iface) {
            (Some(address), Some(cidr), Some(iface)) => Ok(VipSettings {
                address: address.clone(),
                cidr,
                iface: iface.clone(),
            }),
            _ => Err(CairnError::config(
                "insufficient VIP information: vip, vip_cidr and vip_iface are required",
            )),
        }
    }
}

/// Credentials the renderer needs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    /// Database root password
    pub root_password: Option<String>,
    /// State-transfer user password
    pub sst_password: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("root_password", &self.root_password.as_ref().map(|_| "<redacted>"))
            .field("sst_password", &self.sst_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Non-secret inputs to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSettings {
    /// Cluster name
    pub cluster_name: String,
    /// Maximum client connections, when set
    pub max_connections: Option<u32>,
    /// Working-set size used to size the buffer pool
    pub dataset_size: Option<DatasetSize>,
    /// Host memory, for percentage sizes
    pub host_memory_bytes: Option<u64>,
    /// Additional options, rendered in key order
    pub extra_options: BTreeMap<String, String>,
}

impl Default for BaseSettings {
    fn default() -> Self {
        Self {
            cluster_name: "cairn_cluster".to_string(),
            max_connections: None,
            dataset_size: None,
            host_memory_bytes: None,
            extra_options: BTreeMap::new(),
        }
    }
}

/// Working-set size specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSize {
    /// Absolute size in bytes
    Bytes(u64),
    /// Percentage of host memory
    Percent(u8),
}

impl DatasetSize {
    /// Parse `512M`, `2G`, `1073741824` or `50%`
    pub fn parse(s: &str) -> CairnResult<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let pct: u8 = pct
                .parse()
                .map_err(|_| CairnError::config(format!("invalid dataset_size: {s}")))?;
            if pct == 0 || pct > 100 {
                return Err(CairnError::config(format!("dataset_size out of range: {s}")));
            }
            return Ok(Self::Percent(pct));
        }

        let (digits, multiplier) = match s.chars().last() {
            Some('K') | Some('k') => (&s[..s.len() - 1], 1u64 << 10),
            Some('M') | Some('m') => (&s[..s.len() - 1], 1 << 20),
            Some('G') | Some('g') => (&s[..s.len() - 1], 1 << 30),
            Some('T') | Some('t') => (&s[..s.len() - 1], 1 << 40),
            _ => (s, 1),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| CairnError::config(format!("invalid dataset_size: {s}")))?;
        value
            .checked_mul(multiplier)
            .map(Self::Bytes)
            .ok_or_else(|| CairnError::config(format!("dataset_size overflows: {s}")))
    }

    /// Resolve to bytes, given the host memory for percentage sizes
    pub fn resolve(&self, host_memory_bytes: Option<u64>) -> CairnResult<u64> {
        match self {
            Self::Bytes(bytes) => Ok(*bytes),
            Self::Percent(pct) => host_memory_bytes
                .map(|mem| mem / 100 * u64::from(*pct))
                .ok_or_else(|| {
                    CairnError::config("percentage dataset_size requires host_memory_bytes")
                }),
        }
    }
}

/// Floating address definition handed to the resource manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipSettings {
    /// Floating address
    pub address: String,
    /// Netmask length
    pub cidr: u8,
    /// Network interface
    pub iface: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let toml = r#"
cluster_name = "prod"
sst_password = "s3cret"
vip = "10.0.0.100"
vip_cidr = 24
vip_iface = "eth1"
dataset_size = "2G"
"#;
        writeln!(file, "{toml}").unwrap();

        let config = ServiceConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.sst_password.as_deref(), Some("s3cret"));
        assert_eq!(config.ha_mcastport, 5490);
        assert_eq!(
            config.base_settings().unwrap().dataset_size,
            Some(DatasetSize::Bytes(2 << 30))
        );
        assert_eq!(config.vip_settings().unwrap().iface, "eth1");
    }

    #[test]
    fn unsupported_extension_is_config_error() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = ServiceConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, CairnError::Config { .. }));
    }

    #[test]
    fn vip_settings_require_all_parts() {
        let config = ServiceConfig {
            vip: Some("10.0.0.100".into()),
            vip_cidr: Some(24),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.vip_settings(),
            Err(CairnError::Config { .. })
        ));
    }

    #[test]
    fn set_from_string_accepts_dashed_keys() {
        let mut config = ServiceConfig::default();
        config.set_from_string("sst-password", "pw").unwrap();
        config.set_from_string("max-connections", "500").unwrap();
        assert_eq!(config.sst_password.as_deref(), Some("pw"));
        assert_eq!(config.base_settings().unwrap().max_connections, Some(500));
        assert!(config.set_from_string("bogus", "1").is_err());
    }

    #[test]
    fn dataset_size_parsing() {
        assert_eq!(DatasetSize::parse("512M").unwrap(), DatasetSize::Bytes(512 << 20));
        assert_eq!(DatasetSize::parse("1024").unwrap(), DatasetSize::Bytes(1024));
        assert_eq!(DatasetSize::parse("50%").unwrap(), DatasetSize::Percent(50));
        assert!(DatasetSize::parse("150%").is_err());
        assert!(DatasetSize::parse("lots").is_err());
        assert_eq!(
            DatasetSize::Percent(50).resolve(Some(8 << 30)).unwrap(),
            4 << 30
        );
        assert!(DatasetSize::Percent(50).resolve(None).is_err());
    }

    #[test]
    fn percentage_size_needs_host_memory() {
        let config = ServiceConfig {
            dataset_size: Some("25%".into()),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

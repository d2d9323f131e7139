//! Database configuration rendering
//!
//! Pure: topology + secrets + base settings in, bytes + fingerprint out. The
//! fingerprint is taken over the rendered bytes, so any formatting change is a
//! configuration change.

use std::fmt::Write as _;

use cairn_core::{BaseSettings, CairnError, CairnResult, NodeAddress, RenderedConfig, Secrets};

use crate::membership::ClusterTopology;

/// User the cluster uses for state snapshot transfer.
pub const SST_USER: &str = "sstuser";

/// Everything the renderer reads
#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    /// Local node address
    pub local_address: &'a NodeAddress,
    /// Current topology snapshot
    pub topology: &'a ClusterTopology,
    /// Credentials
    pub secrets: &'a Secrets,
    /// Static settings
    pub settings: &'a BaseSettings,
}

/// Renders the database server configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigRenderer;

impl ConfigRenderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self
    }

    /// Render configuration for `inputs`.
    ///
    /// Fails with [`CairnError::Config`] when the SST password is absent.
    pub fn render(&self, inputs: RenderInputs<'_>) -> CairnResult<RenderedConfig> {
        let sst_password = inputs
            .secrets
            .sst_password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CairnError::config("sst_password is required"))?;

        let settings = inputs.settings;
        let cluster_address = if inputs.topology.is_multi_node() {
            inputs
                .topology
                .addresses()
                .map(NodeAddress::as_str)
                .collect::<Vec<_>>()
                .join(",")
        } else {
            String::new()
        };

        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(out, "[client]");
        let _ = writeln!(out, "port = 3306");
        let _ = writeln!(out, "socket = /var/run/mysqld/mysqld.sock");
        let _ = writeln!(out);
        let _ = writeln!(out, "[mysqld]");
        let _ = writeln!(out, "user = mysql");
        let _ = writeln!(out, "bind-address = 0.0.0.0");
        let _ = writeln!(out, "datadir = /var/lib/mysql");
        let _ = writeln!(out, "binlog_format = ROW");
        let _ = writeln!(out, "default_storage_engine = InnoDB");
        let _ = writeln!(out, "innodb_autoinc_lock_mode = 2");
        let _ = writeln!(out, "innodb_locks_unsafe_for_binlog = 1");
        let _ = writeln!(out, "wsrep_provider = /usr/lib/libgalera_smm.so");
        let _ = writeln!(out, "wsrep_cluster_name = {}", settings.cluster_name);
        let _ = writeln!(out, "wsrep_cluster_address = gcomm://{cluster_address}");
        let _ = writeln!(out, "wsrep_node_address = {}", inputs.local_address);
        let _ = writeln!(out, "wsrep_sst_method = xtrabackup");
        let _ = writeln!(out, "wsrep_sst_auth = \"{SST_USER}:{sst_password}\"");

        if let Some(max_connections) = settings.max_connections {
            let _ = writeln!(out, "max_connections = {max_connections}");
        }
        if let Some(size) = settings.dataset_size {
            let bytes = size.resolve(settings.host_memory_bytes)?;
            let _ = writeln!(out, "innodb_buffer_pool_size = {bytes}");
        }
        for (key, value) in &settings.extra_options {
            let _ = writeln!(out, "{key} = {value}");
        }

        Ok(RenderedConfig::new(out.into_bytes()))
    }
}

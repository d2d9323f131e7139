//! Floating address resource definitions
//!
//! When the HA relation forms, the node hands the resource manager one
//! address resource plus a group containing it. The manager then decides
//! which node holds the address; cairn never asserts ownership itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use cairn_core::effects::{HaResourceSet, ResourceEffects};
use cairn_core::{CairnError, CairnResult, ServiceConfig};

/// Resource agent managing a floating IPv4 address.
pub const VIP_AGENT: &str = "ocf:heartbeat:IPaddr2";

/// Build resource definitions from configuration.
///
/// Missing `vip`, `vip_cidr` or `vip_iface` is a [`CairnError::Config`];
/// the caller decides whether that aborts the process.
pub fn ha_resources(config: &ServiceConfig) -> CairnResult<HaResourceSet> {
    let vip = config.vip_settings()?;
    let resource = config.leader_resource.clone();

    let resources = BTreeMap::from([(resource.clone(), VIP_AGENT.to_string())]);
    let resource_params = BTreeMap::from([(
        resource.clone(),
        format!(
            "params ip=\"{}\" cidr_netmask=\"{}\" nic=\"{}\"",
            vip.address, vip.cidr, vip.iface
        ),
    )]);
    let groups = BTreeMap::from([(config.resource_group.clone(), resource)]);

    Ok(HaResourceSet {
        bindiface: config.ha_bindiface.clone(),
        mcastport: config.ha_mcastport,
        resources,
        resource_params,
        groups,
    })
}

/// Submit the floating address definitions to the resource manager
pub async fn define_vip_resources(
    resources: &Arc<dyn ResourceEffects>,
    config: &ServiceConfig,
) -> CairnResult<HaResourceSet> {
    let set = ha_resources(config).map_err(|e| {
        tracing::error!(error = %e, "insufficient VIP information to configure cluster");
        e
    })?;
    resources
        .define_resources(&set)
        .await
        .map_err(|e| CairnError::config(format!("resource definition rejected: {e}")))?;
    tracing::info!(resource = %config.leader_resource, "floating address resources defined");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig {
            vip: Some("10.0.0.100".into()),
            vip_cidr: Some(24),
            vip_iface: Some("eth0".into()),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn builds_address_resource_and_group() {
        let set = ha_resources(&config()).unwrap();
        assert_eq!(set.resources["res_mysql_vip"], VIP_AGENT);
        assert_eq!(
            set.resource_params["res_mysql_vip"],
            "params ip=\"10.0.0.100\" cidr_netmask=\"24\" nic=\"eth0\""
        );
        assert_eq!(set.groups["grp_cairn_cluster"], "res_mysql_vip");
        assert_eq!(set.mcastport, 5490);
    }

    #[test]
    fn missing_vip_is_config_error() {
        let config = ServiceConfig {
            vip_iface: None,
            ..config()
        };
        assert!(matches!(ha_resources(&config), Err(CairnError::Config { .. })));
    }
}

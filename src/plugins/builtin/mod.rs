//! Built-in operator plugins.
//!
//! This module contains the operators that ship with the registry.

mod node_feature_discovery;
mod nvidia_gpu;
mod lvm;
mod mce;

use crate::config::OperatorsConfig;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::plugins::registry::PluginRegistry;

/// Register all enabled built-in operators.
///
/// Registration order matters for tie-breaking during resolution, so it is
/// fixed here.
pub fn register_all(registry: &mut PluginRegistry, config: &OperatorsConfig) -> ConfigurationResult<()> {
    node_feature_discovery::register(registry, &config.node_feature_discovery)?;
    nvidia_gpu::register(registry, &config.nvidia_gpu)?;
    lvm::register(registry, &config.lvm)?;
    mce::register(registry, &config.mce)?;
    Ok(())
}

// Re-export for direct access
pub use node_feature_discovery::NodeFeatureDiscovery;
pub use nvidia_gpu::NvidiaGpu;
pub use lvm::Lvm;
pub use mce::Mce;

/// Parse a configured minimum OpenShift version.
///
/// A bad value is the plugin's own misconfiguration, so it surfaces as
/// `InvalidInput` rather than as a validation failure.
pub(crate) fn parse_minimum_version(operator: &str, raw: &str) -> Result<semver::Version, PluginError> {
    semver::Version::parse(raw).map_err(|e| {
        PluginError::InvalidInput(format!(
            "minimum OpenShift version '{}' for {}: {}",
            raw, operator, e
        ))
    })
}

/// Check the cluster's OpenShift version against a minimum.
///
/// Returns the failure reasons; empty means the version is acceptable.
pub(crate) fn check_minimum_version(
    cluster: &crate::core::types::Cluster,
    operator: &str,
    minimum: &semver::Version,
) -> Vec<String> {
    match cluster.parsed_openshift_version() {
        Ok(version) if version >= *minimum => Vec::new(),
        Ok(version) => vec![format!(
            "{} is only supported for OpenShift versions {} and above, found {}",
            operator, minimum, version
        )],
        Err(_) => vec![format!(
            "Cannot determine whether {} supports OpenShift version '{}'",
            operator, cluster.openshift_version
        )],
    }
}

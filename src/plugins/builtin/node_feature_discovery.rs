//! Node Feature Discovery: labels nodes with their hardware features.

use crate::config::NodeFeatureDiscoveryConfig;
use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::plugin::{validation_id, OperatorPlugin};
use crate::core::result::ValidationResult;
use crate::core::types::{Cluster, FeatureSupportId, Host, OperatorDescriptor, Quantitative};
use crate::plugins::registry::PluginRegistry;

/// Operator name.
pub const NAME: &str = "node-feature-discovery";

/// Register the plugin if enabled.
pub fn register(registry: &mut PluginRegistry, config: &NodeFeatureDiscoveryConfig) -> ConfigurationResult<()> {
    if config.enabled {
        registry.register(NodeFeatureDiscovery)?;
    }
    Ok(())
}

/// Node Feature Discovery operator. No requirements of its own.
#[derive(Debug, Clone, Default)]
pub struct NodeFeatureDiscovery;

impl OperatorPlugin for NodeFeatureDiscovery {
    fn name(&self) -> &str {
        NAME
    }

    fn full_name(&self) -> &str {
        "Node Feature Discovery"
    }

    fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }

    fn cluster_validation_id(&self) -> String {
        validation_id(NAME)
    }

    fn host_validation_id(&self) -> String {
        validation_id(NAME)
    }

    fn validate_cluster(
        &self,
        ctx: &CallContext,
        _cluster: &Cluster,
    ) -> Result<ValidationResult, PluginError> {
        ctx.check()?;
        Ok(ValidationResult::success(self.cluster_validation_id()))
    }

    fn validate_host(
        &self,
        ctx: &CallContext,
        _cluster: &Cluster,
        _host: &Host,
        _requirements: &Quantitative,
    ) -> Result<ValidationResult, PluginError> {
        ctx.check()?;
        Ok(ValidationResult::success(self.host_validation_id()))
    }

    fn monitored_operator(&self) -> OperatorDescriptor {
        OperatorDescriptor::olm(NAME, self.full_name(), "openshift-nfd", "nfd", 30 * 60)
    }

    fn feature_support_id(&self) -> FeatureSupportId {
        FeatureSupportId::NodeFeatureDiscovery
    }
}

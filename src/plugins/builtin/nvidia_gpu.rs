//! NVIDIA GPU operator.

use crate::config::NvidiaGpuConfig;
use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::plugin::{validation_id, OperatorPlugin};
use crate::core::result::ValidationResult;
use crate::core::types::{Cluster, FeatureSupportId, Host, OperatorDescriptor, Quantitative};
use crate::plugins::builtin::node_feature_discovery;
use crate::plugins::registry::PluginRegistry;

/// Operator name.
pub const NAME: &str = "nvidia-gpu";

/// Register the plugin if enabled.
pub fn register(registry: &mut PluginRegistry, config: &NvidiaGpuConfig) -> ConfigurationResult<()> {
    if config.enabled {
        registry.register(NvidiaGpu::new(config.clone()))?;
    }
    Ok(())
}

/// NVIDIA GPU operator.
///
/// Relies on Node Feature Discovery to label GPU nodes. Hardware checks
/// are left to the operator itself at runtime, so both validations pass.
#[derive(Debug, Clone)]
pub struct NvidiaGpu {
    config: NvidiaGpuConfig,
}

impl NvidiaGpu {
    pub fn new(config: NvidiaGpuConfig) -> Self {
        Self { config }
    }
}

impl OperatorPlugin for NvidiaGpu {
    fn name(&self) -> &str {
        NAME
    }

    fn full_name(&self) -> &str {
        "NVIDIA GPU"
    }

    fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
        Ok(vec![node_feature_discovery::NAME.to_string()])
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
        OperatorDescriptor::olm(
            NAME,
            self.full_name(),
            "nvidia-gpu-operator",
            "gpu-operator-certified",
            self.config.timeout_seconds,
        )
    }

    fn feature_support_id(&self) -> FeatureSupportId {
        FeatureSupportId::NvidiaGpu
    }
}

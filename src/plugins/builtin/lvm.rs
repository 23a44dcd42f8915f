//! Logical Volume Manager storage operator.

use crate::config::LvmConfig;
use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::plugin::{validation_id, OperatorPlugin};
use crate::core::result::ValidationResult;
use crate::core::types::{
    Cluster, FeatureSupportId, Host, HostTypeRequirements, OperatorDescriptor, OperatorProperty,
    Quantitative,
};
use crate::plugins::builtin::{check_minimum_version, parse_minimum_version};
use crate::plugins::registry::PluginRegistry;

/// Operator name.
pub const NAME: &str = "lvm";

/// Register the plugin if enabled.
pub fn register(registry: &mut PluginRegistry, config: &LvmConfig) -> ConfigurationResult<()> {
    if config.enabled {
        registry.register(Lvm::new(config.clone()))?;
    }
    Ok(())
}

/// LVM storage operator.
///
/// Needs a minimum OpenShift release and, by default, one spare disk per
/// host to build its volume group from.
#[derive(Debug, Clone)]
pub struct Lvm {
    config: LvmConfig,
}

impl Lvm {
    pub fn new(config: LvmConfig) -> Self {
        Self { config }
    }

    fn minimum_version(&self) -> Result<semver::Version, PluginError> {
        parse_minimum_version(NAME, &self.config.minimum_openshift_version)
    }
}

impl OperatorPlugin for Lvm {
    fn name(&self) -> &str {
        NAME
    }

    fn full_name(&self) -> &str {
        "Logical Volume Manager Storage"
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
        cluster: &Cluster,
    ) -> Result<ValidationResult, PluginError> {
        ctx.check()?;
        let minimum = self.minimum_version()?;
        let reasons = check_minimum_version(cluster, self.full_name(), &minimum);
        Ok(ValidationResult::from_reasons(self.cluster_validation_id(), reasons))
    }

    fn validate_host(
        &self,
        ctx: &CallContext,
        _cluster: &Cluster,
        host: &Host,
        _requirements: &Quantitative,
    ) -> Result<ValidationResult, PluginError> {
        ctx.check()?;
        let Some(inventory) = &host.inventory else {
            return Ok(ValidationResult::pending(
                self.host_validation_id(),
                "Missing inventory in the host",
            ));
        };

        let mut reasons = Vec::new();
        if self.config.require_additional_disk && inventory.additional_disks().next().is_none() {
            reasons.push(format!(
                "{} requires at least one non-installation disk on host {}",
                self.full_name(),
                host.hostname
            ));
        }
        Ok(ValidationResult::from_reasons(self.host_validation_id(), reasons))
    }

    fn properties(&self) -> Vec<OperatorProperty> {
        vec![OperatorProperty {
            name: "deviceClass".to_string(),
            data_type: "string".to_string(),
            mandatory: false,
            description: "Name of the LVM device class to create".to_string(),
            default_value: Some("vg1".to_string()),
        }]
    }

    fn monitored_operator(&self) -> OperatorDescriptor {
        OperatorDescriptor::olm(NAME, self.full_name(), "openshift-storage", "lvms-operator", 30 * 60)
    }

    fn feature_support_id(&self) -> FeatureSupportId {
        FeatureSupportId::Lvm
    }

    fn node_requirements(&self, _cluster: &Cluster) -> Result<HostTypeRequirements, PluginError> {
        Ok(HostTypeRequirements {
            master: self.config.master.clone(),
            worker: self.config.worker.clone(),
        })
    }

    fn host_requirements(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        host: &Host,
    ) -> Result<Quantitative, PluginError> {
        let preflight = self.preflight_requirements(ctx, cluster)?;
        Ok(preflight.requirements.for_role(host.role).clone())
    }
}

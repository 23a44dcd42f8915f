//! Multicluster engine operator.

use crate::config::MceConfig;
use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::plugin::{validation_id, OperatorPlugin};
use crate::core::result::ValidationResult;
use crate::core::types::{
    Cluster, FeatureSupportId, Host, HostTypeRequirements, OperatorDescriptor, Quantitative,
};
use crate::plugins::builtin::{check_minimum_version, parse_minimum_version};
use crate::plugins::registry::PluginRegistry;

/// Operator name.
pub const NAME: &str = "mce";

/// Register the plugin if enabled.
pub fn register(registry: &mut PluginRegistry, config: &MceConfig) -> ConfigurationResult<()> {
    if config.enabled {
        registry.register(Mce::new(config.clone()))?;
    }
    Ok(())
}

/// Multicluster engine operator.
///
/// Heavy on CPU and memory, more so on single node clusters where one host
/// carries everything.
#[derive(Debug, Clone)]
pub struct Mce {
    config: MceConfig,
}

impl Mce {
    pub fn new(config: MceConfig) -> Self {
        Self { config }
    }
}

impl OperatorPlugin for Mce {
    fn name(&self) -> &str {
        NAME
    }

    fn full_name(&self) -> &str {
        "multicluster engine"
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
        let minimum = parse_minimum_version(NAME, &self.config.minimum_openshift_version)?;
        let reasons = check_minimum_version(cluster, self.full_name(), &minimum);
        Ok(ValidationResult::from_reasons(self.cluster_validation_id(), reasons))
    }

    fn validate_host(
        &self,
        ctx: &CallContext,
        _cluster: &Cluster,
        host: &Host,
        requirements: &Quantitative,
    ) -> Result<ValidationResult, PluginError> {
        ctx.check()?;
        let Some(inventory) = &host.inventory else {
            return Ok(ValidationResult::pending(
                self.host_validation_id(),
                "Missing inventory in the host",
            ));
        };

        let mut reasons = Vec::new();
        if inventory.cpu_cores < requirements.cpu_cores {
            reasons.push(format!(
                "Insufficient CPU to deploy {}. Required CPU count is {} but found {}",
                self.full_name(),
                requirements.cpu_cores,
                inventory.cpu_cores
            ));
        }
        if inventory.ram_mib < requirements.ram_mib {
            reasons.push(format!(
                "Insufficient memory to deploy {}. Required memory is {} MiB but found {} MiB",
                self.full_name(),
                requirements.ram_mib,
                inventory.ram_mib
            ));
        }
        Ok(ValidationResult::from_reasons(self.host_validation_id(), reasons))
    }

    fn monitored_operator(&self) -> OperatorDescriptor {
        OperatorDescriptor::olm(
            NAME,
            self.full_name(),
            "multicluster-engine",
            "multicluster-engine",
            60 * 60,
        )
    }

    fn feature_support_id(&self) -> FeatureSupportId {
        FeatureSupportId::Mce
    }

    fn node_requirements(&self, cluster: &Cluster) -> Result<HostTypeRequirements, PluginError> {
        let per_host = if cluster.is_single_node() {
            self.config.single_node_requirements.clone()
        } else {
            self.config.requirements.clone()
        };
        Ok(HostTypeRequirements::uniform(per_host))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::ValidationStatus;
    use crate::core::types::{HighAvailabilityMode, HostRole, Inventory};

    fn mce() -> Mce {
        Mce::new(MceConfig::default())
    }

    #[test]
    fn test_single_node_requirements() {
        let ctx = CallContext::new();
        let multi = Cluster::new("multi", "4.14");
        let single =
            Cluster::new("sno", "4.14").with_high_availability_mode(HighAvailabilityMode::None);

        let reqs = mce().preflight_requirements(&ctx, &multi).unwrap().requirements;
        assert_eq!(reqs.worker, Quantitative::new(4, 16384, 0));

        let reqs = mce().preflight_requirements(&ctx, &single).unwrap().requirements;
        assert_eq!(reqs.master, Quantitative::new(8, 32768, 0));
    }

    #[test]
    fn test_bad_minimum_version() {
        let plugin = Mce::new(MceConfig {
            minimum_openshift_version: "4.x".to_string(),
            ..MceConfig::default()
        });
        let error = plugin
            .validate_cluster(&CallContext::new(), &Cluster::new("test", "4.14"))
            .unwrap_err();
        assert_eq!(
            error,
            parse_minimum_version(NAME, "4.x").unwrap_err()
        );
    }

    #[test]
    fn test_host_below_requirements() {
        let host = Host::new("w0", HostRole::Worker).with_inventory(Inventory {
            cpu_cores: 2,
            ram_mib: 8192,
            ..Inventory::default()
        });
        let result = mce()
            .validate_host(
                &CallContext::new(),
                &Cluster::new("test", "4.14"),
                &host,
                &Quantitative::new(4, 16384, 0),
            )
            .unwrap();

        assert_eq!(result.status, ValidationStatus::Failure);
        assert_eq!(result.reasons.len(), 2);
        assert!(result.reasons[0].contains("Required CPU count is 4 but found 2"));
    }

    #[test]
    fn test_host_meets_requirements() {
        let host = Host::new("w0", HostRole::Worker).with_inventory(Inventory {
            cpu_cores: 16,
            ram_mib: 65536,
            ..Inventory::default()
        });
        let result = mce()
            .validate_host(
                &CallContext::new(),
                &Cluster::new("test", "4.14"),
                &host,
                &Quantitative::new(4, 16384, 0),
            )
            .unwrap();
        assert!(result.is_success());
    }
}

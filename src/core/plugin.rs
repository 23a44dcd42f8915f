//! OperatorPlugin trait and the data-driven `StaticPlugin`.
//!
//! The OperatorPlugin trait is the capability contract every add-on
//! implements: identity, dependencies, validation and hardware requirements.

use crate::core::context::CallContext;
use crate::core::error::PluginError;
use crate::core::result::ValidationResult;
use crate::core::types::{
    Cluster, FeatureSupportId, HardwareRequirements, Host, HostTypeRequirements,
    OperatorDescriptor, OperatorProperty, OperatorType, Quantitative,
};

/// Suffix shared by every validation identifier.
pub const VALIDATION_ID_SUFFIX: &str = "-requirements-satisfied";

/// Build the stable validation identifier for a domain, e.g.
/// `lvm-requirements-satisfied`.
pub fn validation_id(domain: &str) -> String {
    format!("{}{}", domain, VALIDATION_ID_SUFFIX)
}

/// The capability contract for operator plugins.
///
/// # Design
///
/// Plugins are constructed once at startup and shared read-only between
/// concurrent calls, hence the `Send + Sync` bound and `&self` receivers.
/// Anything that varies per call comes in through the arguments.
///
/// Two kinds of "no" are kept apart:
///
/// 1. **Validation failure**: the plugin looked at the cluster and found it
///    lacking. Return `Ok` with a `Failure` result and human-readable
///    reasons.
/// 2. **Infrastructure failure**: the plugin could not reach a verdict.
///    Return `Err(PluginError)`.
///
/// # Example Implementation
///
/// ```ignore
/// struct Storage;
///
/// impl OperatorPlugin for Storage {
///     fn name(&self) -> &str { "storage" }
///     fn full_name(&self) -> &str { "Storage" }
///     fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
///         Ok(vec!["lvm".to_string()])
///     }
///     fn cluster_validation_id(&self) -> String { validation_id("storage") }
///     fn host_validation_id(&self) -> String { validation_id("storage") }
///     fn validate_cluster(&self, _ctx: &CallContext, _cluster: &Cluster)
///         -> Result<ValidationResult, PluginError> {
///         Ok(ValidationResult::success(self.cluster_validation_id()))
///     }
///     // ...
/// }
/// ```
pub trait OperatorPlugin: Send + Sync {
    /// Stable unique name, used as the dependency graph key.
    fn name(&self) -> &str;

    /// Human-readable name.
    fn full_name(&self) -> &str;

    /// Operators that must be installed and validated before this one.
    ///
    /// Must not contain the plugin's own name. Cycles across plugins are
    /// detected by the registry.
    fn dependencies(&self, cluster: &Cluster) -> Result<Vec<String>, PluginError>;

    /// Identifier keying this plugin's cluster-level result.
    fn cluster_validation_id(&self) -> String;

    /// Identifier keying this plugin's host-level result.
    fn host_validation_id(&self) -> String;

    /// Check whether the cluster can run the operator.
    ///
    /// The returned result always carries `cluster_validation_id()`.
    fn validate_cluster(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
    ) -> Result<ValidationResult, PluginError>;

    /// Check whether a host satisfies the operator's requirements.
    ///
    /// The returned result always carries `host_validation_id()`.
    fn validate_host(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        host: &Host,
        requirements: &Quantitative,
    ) -> Result<ValidationResult, PluginError>;

    /// User-configurable properties.
    fn properties(&self) -> Vec<OperatorProperty> {
        Vec::new()
    }

    /// How the operator is installed and monitored.
    fn monitored_operator(&self) -> OperatorDescriptor;

    /// Feature-support entry gating this operator.
    fn feature_support_id(&self) -> FeatureSupportId;

    /// Per host class resources the operator needs, computed from the
    /// cluster alone. Defaults to nothing.
    fn node_requirements(&self, _cluster: &Cluster) -> Result<HostTypeRequirements, PluginError> {
        Ok(HostTypeRequirements::default())
    }

    /// Hardware requirements computable before hosts are inspected.
    ///
    /// Embeds `dependencies(cluster)` so the record is self-describing.
    fn preflight_requirements(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
    ) -> Result<HardwareRequirements, PluginError> {
        ctx.check()?;
        let dependencies = self.dependencies(cluster)?;
        let requirements = self.node_requirements(cluster)?;

        Ok(HardwareRequirements {
            operator_name: self.name().to_string(),
            dependencies,
            requirements,
        })
    }

    /// Requirements one specific host has to meet.
    ///
    /// Defaults to the worker requirements. Plugins whose demand differs
    /// per host class override this and pick by `host.role`.
    fn host_requirements(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        _host: &Host,
    ) -> Result<Quantitative, PluginError> {
        match self.preflight_requirements(ctx, cluster) {
            Ok(preflight) => Ok(preflight.requirements.worker),
            Err(error) => {
                log::error!(
                    "Cannot retrieve preflight requirements of '{}' for cluster {}: {}",
                    self.name(),
                    cluster.id,
                    error
                );
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for dyn OperatorPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorPlugin")
            .field("name", &self.name())
            .finish()
    }
}

/// A plugin defined entirely by data.
///
/// Its checks always pass and its requirements are fixed. Used for
/// operators declared in the configuration file.
#[derive(Debug, Clone)]
pub struct StaticPlugin {
    name: String,
    full_name: String,
    dependencies: Vec<String>,
    requirements: HostTypeRequirements,
    descriptor: OperatorDescriptor,
    properties: Vec<OperatorProperty>,
}

impl StaticPlugin {
    /// Create a new builder.
    pub fn builder(name: impl Into<String>) -> StaticPluginBuilder {
        StaticPluginBuilder::new(name)
    }
}

impl OperatorPlugin for StaticPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
        Ok(self.dependencies.clone())
    }

    fn cluster_validation_id(&self) -> String {
        validation_id(&self.name)
    }

    fn host_validation_id(&self) -> String {
        validation_id(&self.name)
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

    fn properties(&self) -> Vec<OperatorProperty> {
        self.properties.clone()
    }

    fn monitored_operator(&self) -> OperatorDescriptor {
        self.descriptor.clone()
    }

    fn feature_support_id(&self) -> FeatureSupportId {
        FeatureSupportId::Custom(self.name.clone())
    }

    fn node_requirements(&self, _cluster: &Cluster) -> Result<HostTypeRequirements, PluginError> {
        Ok(self.requirements.clone())
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

/// Builder for StaticPlugin.
pub struct StaticPluginBuilder {
    name: String,
    full_name: Option<String>,
    namespace: Option<String>,
    dependencies: Vec<String>,
    requirements: HostTypeRequirements,
    timeout_seconds: u64,
    properties: Vec<OperatorProperty>,
}

impl StaticPluginBuilder {
    /// Create a new builder with the required name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            namespace: None,
            dependencies: Vec::new(),
            requirements: HostTypeRequirements::default(),
            timeout_seconds: 30 * 60,
            properties: Vec::new(),
        }
    }

    /// Set the human-readable name.
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the install namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Add multiple dependencies.
    pub fn dependencies(mut self, dependencies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies
            .extend(dependencies.into_iter().map(|d| d.into()));
        self
    }

    /// Set master requirements.
    pub fn master(mut self, requirements: Quantitative) -> Self {
        self.requirements.master = requirements;
        self
    }

    /// Set worker requirements.
    pub fn worker(mut self, requirements: Quantitative) -> Self {
        self.requirements.worker = requirements;
        self
    }

    /// Set the install timeout.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Add a property.
    pub fn property(mut self, property: OperatorProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Build the plugin.
    pub fn build(self) -> StaticPlugin {
        let full_name = self.full_name.unwrap_or_else(|| self.name.clone());
        let namespace = self.namespace.unwrap_or_else(|| self.name.clone());
        let descriptor = OperatorDescriptor {
            name: self.name.clone(),
            display_name: full_name.clone(),
            namespace,
            operator_type: OperatorType::Olm,
            subscription_name: Some(self.name.clone()),
            timeout_seconds: self.timeout_seconds,
        };

        StaticPlugin {
            name: self.name,
            full_name,
            dependencies: self.dependencies,
            requirements: self.requirements,
            descriptor,
            properties: self.properties,
        }
    }
}

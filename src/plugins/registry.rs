//! Plugin registry for managing available operators.

use crate::config::OperatorsConfig;
use crate::core::error::{ConfigurationError, ConfigurationResult};
use crate::core::plugin::OperatorPlugin;
use crate::core::types::{Cluster, FeatureSupportId, OperatorDescriptor, OperatorProperty};
use crate::graph::{DependencyGraph, TopologyAnalyzer};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a registered plugin.
pub type PluginRef = Arc<dyn OperatorPlugin>;

/// Registry entry containing the plugin and its cached metadata.
#[derive(Clone)]
pub struct RegistryEntry {
    /// The plugin implementation.
    pub plugin: PluginRef,
    /// Descriptor captured at registration.
    pub descriptor: OperatorDescriptor,
    /// Feature-support id captured at registration.
    pub feature_support_id: FeatureSupportId,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("plugin", &self.plugin.name())
            .field("descriptor", &self.descriptor)
            .field("feature_support_id", &self.feature_support_id)
            .finish()
    }
}

/// Plugins for one request, in dependency order.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    /// Plugins ordered so that dependencies come first.
    pub plugins: Vec<PluginRef>,
    /// Levels of mutually independent plugins, as indices into `plugins`.
    pub levels: Vec<Vec<usize>>,
}

impl ResolutionPlan {
    /// Operator names in resolved order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Registry for all known operator plugins.
///
/// Populated once at startup and read-only afterwards. Iteration order is
/// registration order, which is also the tie-breaker for dependency
/// resolution.
pub struct PluginRegistry {
    /// Plugins indexed by operator name.
    plugins: IndexMap<String, RegistryEntry>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            plugins: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in operators.
    pub fn with_builtins(config: &OperatorsConfig) -> ConfigurationResult<Self> {
        RegistryBuilder::new().with_config(config.clone()).build()
    }

    /// Register a plugin.
    ///
    /// Fails with `DuplicateName` if a plugin with the same name exists.
    pub fn register<P>(&mut self, plugin: P) -> ConfigurationResult<()>
    where
        P: OperatorPlugin + 'static,
    {
        self.register_shared(Arc::new(plugin))
    }

    /// Register an already shared plugin.
    pub fn register_shared(&mut self, plugin: PluginRef) -> ConfigurationResult<()> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(ConfigurationError::DuplicateName { name });
        }

        let entry = RegistryEntry {
            descriptor: plugin.monitored_operator(),
            feature_support_id: plugin.feature_support_id(),
            plugin,
        };

        log::debug!("Registered operator plugin '{}'", name);
        self.plugins.insert(name, entry);
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> ConfigurationResult<PluginRef> {
        self.plugins
            .get(name)
            .map(|e| e.plugin.clone())
            .ok_or_else(|| ConfigurationError::NotFound {
                name: name.to_string(),
            })
    }

    /// Get a registry entry.
    pub fn get_entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.plugins.get(name)
    }

    /// Registration index of a plugin.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.plugins.get_index_of(name)
    }

    /// Entry at a registration index.
    pub fn entry_at(&self, index: usize) -> Option<&RegistryEntry> {
        self.plugins.get_index(index).map(|(_, entry)| entry)
    }

    /// Check if a plugin is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// All registered operator names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(|s| s.as_str())
    }

    /// All registered plugins, in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginRef> {
        self.plugins.values().map(|e| &e.plugin)
    }

    /// Get the total number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names of all operators the installer can offer.
    pub fn supported_operators(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Descriptors of all registered operators.
    pub fn monitored_operators(&self) -> Vec<OperatorDescriptor> {
        self.plugins.values().map(|e| e.descriptor.clone()).collect()
    }

    /// Properties of one operator.
    pub fn operator_properties(&self, name: &str) -> ConfigurationResult<Vec<OperatorProperty>> {
        Ok(self.get(name)?.properties())
    }

    /// Feature-support ids keyed by operator name.
    pub fn feature_support_ids(&self) -> IndexMap<String, FeatureSupportId> {
        self.plugins
            .iter()
            .map(|(name, e)| (name.clone(), e.feature_support_id.clone()))
            .collect()
    }

    /// Resolve `names` plus their transitive dependencies into installation
    /// order.
    ///
    /// Dependencies come before their dependents; otherwise plugins keep
    /// registration order. Repeated names are collapsed. Does not modify the
    /// registry and may be called concurrently.
    pub fn resolve_order<S: AsRef<str>>(
        &self,
        cluster: &Cluster,
        names: &[S],
    ) -> ConfigurationResult<Vec<PluginRef>> {
        Ok(self.resolve_plan(cluster, names)?.plugins)
    }

    /// Like [`resolve_order`](Self::resolve_order), also returning the
    /// levels of mutually independent plugins.
    pub fn resolve_plan<S: AsRef<str>>(
        &self,
        cluster: &Cluster,
        names: &[S],
    ) -> ConfigurationResult<ResolutionPlan> {
        let graph = DependencyGraph::build(self, cluster, names)?;
        let analyzer = TopologyAnalyzer::new(&graph);
        let order = analyzer.topological_sort()?;
        let batches = analyzer.batches_of(&order);

        let position: HashMap<usize, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, &node)| (node, pos))
            .collect();

        let plugins = order
            .iter()
            .map(|&node| self.get(graph.name(node)))
            .collect::<ConfigurationResult<Vec<_>>>()?;

        let levels = batches
            .into_iter()
            .map(|batch| batch.into_iter().map(|node| position[&node]).collect())
            .collect();

        log::debug!(
            "Resolved {:?} to {:?}",
            names.iter().map(|n| n.as_ref()).collect::<Vec<_>>(),
            plugins.iter().map(|p| p.name()).collect::<Vec<_>>()
        );

        Ok(ResolutionPlan { plugins, levels })
    }

    /// Check that no two plugins share a validation identifier.
    ///
    /// Cluster and host identifiers are checked separately; a plugin may use
    /// the same string for both of its own checks.
    pub fn check_validation_ids(&self) -> ConfigurationResult<()> {
        let cluster_ids = self.plugins.values().map(|e| {
            (e.plugin.cluster_validation_id(), e.plugin.name().to_string())
        });
        find_duplicate(cluster_ids)?;

        let host_ids = self.plugins.values().map(|e| {
            (e.plugin.host_validation_id(), e.plugin.name().to_string())
        });
        find_duplicate(host_ids)
    }
}

/// Fail on the first identifier claimed by more than one operator.
fn find_duplicate(ids: impl Iterator<Item = (String, String)>) -> ConfigurationResult<()> {
    let mut owners: IndexMap<String, Vec<String>> = IndexMap::new();
    for (id, operator) in ids {
        owners.entry(id).or_default().push(operator);
    }

    match owners.into_iter().find(|(_, operators)| operators.len() > 1) {
        Some((id, operators)) => Err(ConfigurationError::DuplicateValidationId { id, operators }),
        None => Ok(()),
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    plugins: Vec<PluginRef>,
    include_builtins: bool,
    config: OperatorsConfig,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            include_builtins: true,
            config: OperatorsConfig::default(),
        }
    }

    /// Include or exclude built-in operators.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Configure built-in and custom operators.
    pub fn with_config(mut self, config: OperatorsConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an additional plugin.
    pub fn register<P>(mut self, plugin: P) -> Self
    where
        P: OperatorPlugin + 'static,
    {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Build the registry.
    ///
    /// Built-ins register first, then operators declared in the
    /// configuration, then plugins added with [`register`](Self::register).
    /// Validation identifiers are checked for uniqueness.
    pub fn build(self) -> ConfigurationResult<PluginRegistry> {
        let mut registry = PluginRegistry::new();

        if self.include_builtins {
            crate::plugins::builtin::register_all(&mut registry, &self.config)?;
        }
        for custom in &self.config.custom {
            registry.register(custom.to_plugin())?;
        }
        for plugin in self.plugins {
            registry.register_shared(plugin)?;
        }

        registry.check_validation_ids()?;
        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::CallContext;
    use crate::core::error::PluginError;
    use crate::core::plugin::StaticPlugin;
    use crate::core::result::ValidationResult;
    use crate::core::types::{Host, Quantitative};

    fn cluster() -> Cluster {
        Cluster::new("test", "4.15")
    }

    fn names(plugins: &[PluginRef]) -> Vec<&str> {
        plugins.iter().map(|p| p.name()).collect()
    }

    /// Reuses another plugin's validation ids.
    struct Impostor;

    impl OperatorPlugin for Impostor {
        fn name(&self) -> &str {
            "impostor"
        }
        fn full_name(&self) -> &str {
            "Impostor"
        }
        fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
            Ok(Vec::new())
        }
        fn cluster_validation_id(&self) -> String {
            "lvm-requirements-satisfied".to_string()
        }
        fn host_validation_id(&self) -> String {
            "impostor-requirements-satisfied".to_string()
        }
        fn validate_cluster(
            &self,
            _ctx: &CallContext,
            _cluster: &Cluster,
        ) -> Result<ValidationResult, PluginError> {
            Ok(ValidationResult::success(self.cluster_validation_id()))
        }
        fn validate_host(
            &self,
            _ctx: &CallContext,
            _cluster: &Cluster,
            _host: &Host,
            _requirements: &Quantitative,
        ) -> Result<ValidationResult, PluginError> {
            Ok(ValidationResult::success(self.host_validation_id()))
        }
        fn monitored_operator(&self) -> OperatorDescriptor {
            OperatorDescriptor::olm("impostor", "Impostor", "impostor", "impostor", 60)
        }
        fn feature_support_id(&self) -> FeatureSupportId {
            FeatureSupportId::Custom("impostor".to_string())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = PluginRegistry::new();
        registry.register(StaticPlugin::builder("lvm").build()).unwrap();

        assert!(registry.contains("lvm"));
        assert_eq!(registry.get("lvm").unwrap().name(), "lvm");
        assert_eq!(registry.get_entry("lvm").unwrap().descriptor.name, "lvm");
        assert!(matches!(
            registry.get("ghost"),
            Err(ConfigurationError::NotFound { .. })
        ));
    }

    #[test]
    fn test_debug_output_names_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register(StaticPlugin::builder("lvm").build()).unwrap();

        assert_eq!(format!("{:?}", registry), r#"PluginRegistry { plugins: ["lvm"] }"#);
        assert_eq!(
            format!("{:?}", registry.get("lvm").unwrap()),
            r#"OperatorPlugin { name: "lvm" }"#
        );
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = PluginRegistry::new();
        registry.register(StaticPlugin::builder("lvm").build()).unwrap();

        let error = registry
            .register(StaticPlugin::builder("lvm").build())
            .unwrap_err();
        assert_eq!(
            error,
            ConfigurationError::DuplicateName {
                name: "lvm".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_gpu_scenario() {
        let registry = PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap();

        let order = registry.resolve_order(&cluster(), &["nvidia-gpu"]).unwrap();
        assert_eq!(names(&order), vec!["node-feature-discovery", "nvidia-gpu"]);
    }

    #[test]
    fn test_resolve_gpu_without_nfd() {
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(crate::plugins::builtin::NvidiaGpu::new(Default::default()))
            .build()
            .unwrap();

        let error = registry
            .resolve_order(&cluster(), &["nvidia-gpu"])
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::MissingDependency { ref dependency, .. }
                if dependency == "node-feature-discovery"
        ));
    }

    #[test]
    fn test_resolve_cycle() {
        let mut registry = PluginRegistry::new();
        registry
            .register(StaticPlugin::builder("a").depends_on("b").build())
            .unwrap();
        registry
            .register(StaticPlugin::builder("b").depends_on("a").build())
            .unwrap();

        let error = registry.resolve_order(&cluster(), &["a"]).unwrap_err();
        assert!(matches!(error, ConfigurationError::CyclicDependency { .. }));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap();
        let requested = ["mce", "nvidia-gpu", "lvm"];

        let first = registry.resolve_order(&cluster(), &requested).unwrap();
        let second = registry.resolve_order(&cluster(), &requested).unwrap();
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_resolve_empty_request() {
        let registry = PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap();
        let empty: [&str; 0] = [];

        let plan = registry.resolve_plan(&cluster(), &empty).unwrap();
        assert!(plan.is_empty());
        assert!(plan.levels.is_empty());
    }

    #[test]
    fn test_plan_levels_index_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register(StaticPlugin::builder("a").build()).unwrap();
        registry.register(StaticPlugin::builder("b").build()).unwrap();
        registry
            .register(StaticPlugin::builder("c").dependencies(["a", "b"]).build())
            .unwrap();

        let plan = registry.resolve_plan(&cluster(), &["c"]).unwrap();
        assert_eq!(plan.names(), vec!["a", "b", "c"]);
        assert_eq!(plan.levels, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_duplicate_validation_id() {
        let error = RegistryBuilder::new()
            .register(Impostor)
            .build()
            .unwrap_err();

        assert_eq!(
            error,
            ConfigurationError::DuplicateValidationId {
                id: "lvm-requirements-satisfied".to_string(),
                operators: vec!["lvm".to_string(), "impostor".to_string()],
            }
        );
    }

    #[test]
    fn test_builtin_metadata() {
        let registry = PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap();

        assert_eq!(
            registry.supported_operators(),
            vec!["node-feature-discovery", "nvidia-gpu", "lvm", "mce"]
        );
        assert_eq!(registry.monitored_operators().len(), registry.len());
        assert_eq!(
            registry.feature_support_ids().get("nvidia-gpu"),
            Some(&FeatureSupportId::NvidiaGpu)
        );
        assert!(registry.operator_properties("ghost").is_err());
        assert!(registry.check_validation_ids().is_ok());
    }

    #[test]
    fn test_concurrent_resolution() {
        let registry = Arc::new(PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap());
        let expected = names(&registry.resolve_order(&cluster(), &["nvidia-gpu", "mce"]).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let order = registry
                        .resolve_order(&cluster(), &["nvidia-gpu", "mce"])
                        .unwrap();
                    order.iter().map(|p| p.name().to_string()).collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}

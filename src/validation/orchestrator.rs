//! Validation orchestrator.
//!
//! Calls each selected plugin's check in dependency order and collects the
//! results into a [`ValidationReport`].

use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::plugin::OperatorPlugin;
use crate::core::result::ValidationResult;
use crate::core::types::{Cluster, Host, Quantitative};
use crate::plugins::registry::{PluginRegistry, PluginRef, ResolutionPlan};
use crate::validation::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::validation::report::{ValidationOutcome, ValidationReport};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Reason attached to checks that never ran.
pub const CANCELLED_REASON: &str = "validation cancelled";

/// Orchestrator options.
#[derive(Clone, Default)]
pub struct OrchestratorOptions {
    /// Run independent plugins of one dependency level concurrently.
    pub parallel: bool,
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for OrchestratorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorOptions")
            .field("parallel", &self.parallel)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl OrchestratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}

/// What a run validates.
#[derive(Clone, Copy)]
enum Target<'t> {
    Cluster(&'t Cluster),
    Host {
        cluster: &'t Cluster,
        host: &'t Host,
        requirements: &'t Quantitative,
    },
}

impl Target<'_> {
    fn validation_id(&self, plugin: &dyn OperatorPlugin) -> String {
        match self {
            Target::Cluster(_) => plugin.cluster_validation_id(),
            Target::Host { .. } => plugin.host_validation_id(),
        }
    }

    fn cluster(&self) -> &Cluster {
        match self {
            Target::Cluster(cluster) => cluster,
            Target::Host { cluster, .. } => cluster,
        }
    }

    fn validate(
        &self,
        ctx: &CallContext,
        plugin: &dyn OperatorPlugin,
    ) -> Result<ValidationResult, PluginError> {
        match self {
            Target::Cluster(cluster) => plugin.validate_cluster(ctx, cluster),
            Target::Host {
                cluster,
                host,
                requirements,
            } => plugin.validate_host(ctx, cluster, host, requirements),
        }
    }
}

/// Runs plugin checks against clusters and hosts.
///
/// Holds only a borrowed registry, so one orchestrator can serve concurrent
/// callers.
pub struct ValidationOrchestrator<'a> {
    registry: &'a PluginRegistry,
    options: OrchestratorOptions,
}

impl<'a> ValidationOrchestrator<'a> {
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self {
            registry,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate a cluster against `names` and their dependencies.
    pub fn validate_cluster<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        names: &[S],
    ) -> ConfigurationResult<ValidationReport> {
        let plan = self.registry.resolve_plan(cluster, names)?;
        Ok(self.run(ctx, &plan, Target::Cluster(cluster)))
    }

    /// Validate one host against the requirements it has to meet.
    pub fn validate_host<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        host: &Host,
        requirements: &Quantitative,
        names: &[S],
    ) -> ConfigurationResult<ValidationReport> {
        let plan = self.registry.resolve_plan(cluster, names)?;
        let target = Target::Host {
            cluster,
            host,
            requirements,
        };
        Ok(self.run(ctx, &plan, target))
    }

    fn run(&self, ctx: &CallContext, plan: &ResolutionPlan, target: Target<'_>) -> ValidationReport {
        let start_time = Instant::now();

        let mut tracker = ProgressTracker::new(plan.len());
        if let Some(callback) = &self.options.progress_callback {
            tracker = tracker.with_callback(callback.clone());
        }
        tracker.start();

        let mut slots: Vec<Option<ValidationResult>> = Vec::new();
        slots.resize_with(plan.len(), || None);
        let mut cancelled = false;

        if self.options.parallel {
            for level in &plan.levels {
                if ctx.is_cancelled() {
                    cancelled = true;
                    break;
                }

                let level_results: Vec<_> = level
                    .par_iter()
                    .map(|&index| (index, self.run_one(ctx, &plan.plugins[index], target, &tracker)))
                    .collect();

                for (index, (result, was_cancelled)) in level_results {
                    cancelled |= was_cancelled;
                    slots[index] = Some(result);
                }
            }
        } else {
            for (index, plugin) in plan.plugins.iter().enumerate() {
                if ctx.is_cancelled() {
                    cancelled = true;
                    break;
                }

                let (result, was_cancelled) = self.run_one(ctx, plugin, target, &tracker);
                cancelled |= was_cancelled;
                slots[index] = Some(result);
            }
        }

        let results: Vec<ValidationResult> = slots
            .into_iter()
            .zip(&plan.plugins)
            .map(|(slot, plugin)| {
                slot.unwrap_or_else(|| {
                    tracker.operator_skipped(plugin.name());
                    ValidationResult::pending(target.validation_id(plugin.as_ref()), CANCELLED_REASON)
                })
            })
            .collect();

        let outcome = if cancelled {
            tracker.cancelled();
            ValidationOutcome::Cancelled
        } else {
            ValidationOutcome::Completed
        };
        tracker.complete();

        let report = ValidationReport::new(results, outcome, start_time.elapsed().as_millis() as u64);
        log::debug!(
            "Validation run {} for cluster {}: {}",
            report.run_id,
            target.cluster().id,
            report.summary()
        );
        report
    }

    /// Call one plugin. Returns the result and whether it was cancelled.
    fn run_one(
        &self,
        ctx: &CallContext,
        plugin: &PluginRef,
        target: Target<'_>,
        tracker: &ProgressTracker,
    ) -> (ValidationResult, bool) {
        let started = Instant::now();
        tracker.operator_started(plugin.name());

        let outcome = ctx
            .check()
            .and_then(|_| target.validate(ctx, plugin.as_ref()));

        let (result, cancelled) = match outcome {
            Ok(result) => (result, false),
            Err(PluginError::Cancelled) => (
                ValidationResult::pending(target.validation_id(plugin.as_ref()), CANCELLED_REASON),
                true,
            ),
            Err(error) => {
                log::warn!("Operator '{}' could not be validated: {}", plugin.name(), error);
                (
                    ValidationResult::failure(target.validation_id(plugin.as_ref()), [error.to_string()]),
                    false,
                )
            }
        };

        tracker.operator_completed(plugin.name(), result.status, started.elapsed().as_millis() as u64);
        (result, cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorsConfig;
    use crate::core::context::CancellationToken;
    use crate::core::error::ConfigurationError;
    use crate::core::plugin::StaticPlugin;
    use crate::core::result::ValidationStatus;
    use crate::core::types::{FeatureSupportId, HostRole, Inventory, OperatorDescriptor};
    use crate::plugins::registry::RegistryBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plugin with scripted behaviour.
    struct Scripted {
        name: &'static str,
        dependencies: Vec<String>,
        behaviour: Behaviour,
    }

    #[derive(Clone)]
    enum Behaviour {
        Pass,
        Fail(&'static str),
        Broken,
        /// Cancel the shared token, then report cancellation.
        CancelRun(CancellationToken),
    }

    impl Scripted {
        fn new(name: &'static str, behaviour: Behaviour) -> Self {
            Self {
                name,
                dependencies: Vec::new(),
                behaviour,
            }
        }

        fn depends_on(mut self, dependency: &str) -> Self {
            self.dependencies.push(dependency.to_string());
            self
        }

        fn verdict(&self, id: String) -> Result<ValidationResult, PluginError> {
            match &self.behaviour {
                Behaviour::Pass => Ok(ValidationResult::success(id)),
                Behaviour::Fail(reason) => Ok(ValidationResult::failure(id, [*reason])),
                Behaviour::Broken => Err(PluginError::infrastructure(self.name, "inventory service down")),
                Behaviour::CancelRun(token) => {
                    token.cancel();
                    Err(PluginError::Cancelled)
                }
            }
        }
    }

    impl OperatorPlugin for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        fn full_name(&self) -> &str {
            self.name
        }
        fn dependencies(&self, _cluster: &Cluster) -> Result<Vec<String>, PluginError> {
            Ok(self.dependencies.clone())
        }
        fn cluster_validation_id(&self) -> String {
            crate::core::plugin::validation_id(self.name)
        }
        fn host_validation_id(&self) -> String {
            format!("{}-host-requirements-satisfied", self.name)
        }
        fn validate_cluster(
            &self,
            ctx: &CallContext,
            _cluster: &Cluster,
        ) -> Result<ValidationResult, PluginError> {
            ctx.check()?;
            self.verdict(self.cluster_validation_id())
        }
        fn validate_host(
            &self,
            ctx: &CallContext,
            _cluster: &Cluster,
            _host: &Host,
            _requirements: &Quantitative,
        ) -> Result<ValidationResult, PluginError> {
            ctx.check()?;
            self.verdict(self.host_validation_id())
        }
        fn monitored_operator(&self) -> OperatorDescriptor {
            OperatorDescriptor::olm(self.name, self.name, self.name, self.name, 60)
        }
        fn feature_support_id(&self) -> FeatureSupportId {
            FeatureSupportId::Custom(self.name.to_string())
        }
    }

    fn cluster() -> Cluster {
        Cluster::new("test", "4.15")
    }

    fn diamond(broken: bool) -> PluginRegistry {
        let middle = if broken { Behaviour::Broken } else { Behaviour::Pass };
        RegistryBuilder::new()
            .with_builtins(false)
            .register(Scripted::new("base", Behaviour::Pass))
            .register(Scripted::new("left", middle).depends_on("base"))
            .register(Scripted::new("right", Behaviour::Fail("not enough disks")).depends_on("base"))
            .register(Scripted::new("top", Behaviour::Pass).depends_on("left").depends_on("right"))
            .build()
            .unwrap()
    }

    fn ids(report: &ValidationReport) -> Vec<&str> {
        report.results.iter().map(|r| r.validation_id.as_str()).collect()
    }

    #[test]
    fn test_results_in_dependency_order() {
        let registry = diamond(false);
        let report = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::new(), &cluster(), &["top"])
            .unwrap();

        assert_eq!(
            ids(&report),
            vec![
                "base-requirements-satisfied",
                "left-requirements-satisfied",
                "right-requirements-satisfied",
                "top-requirements-satisfied",
            ]
        );
        assert_eq!(report.outcome, ValidationOutcome::Completed);
        assert!(!report.is_ready());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_validate_cluster_is_idempotent() {
        let registry = diamond(false);
        let orchestrator = ValidationOrchestrator::new(&registry);
        let ctx = CallContext::new();

        let first = orchestrator.validate_cluster(&ctx, &cluster(), &["top"]).unwrap();
        let second = orchestrator.validate_cluster(&ctx, &cluster(), &["top"]).unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(first.outcome, second.outcome);
    }

    #[test]
    fn test_infrastructure_error_becomes_failure() {
        let registry = diamond(true);
        let report = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::new(), &cluster(), &["top"])
            .unwrap();

        let left = report.result("left-requirements-satisfied").unwrap();
        assert_eq!(left.status, ValidationStatus::Failure);
        assert!(left.reasons[0].contains("inventory service down"));
        // The other plugins still ran
        assert!(report.result("top-requirements-satisfied").unwrap().is_success());
        assert_eq!(report.outcome, ValidationOutcome::Completed);
    }

    #[test]
    fn test_cancelled_before_start() {
        let registry = diamond(false);
        let token = CancellationToken::new();
        token.cancel();

        let report = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::with_token(token), &cluster(), &["top"])
            .unwrap();

        assert_eq!(report.outcome, ValidationOutcome::Cancelled);
        assert_eq!(report.results.len(), 4);
        assert!(report
            .results
            .iter()
            .all(|r| r.status == ValidationStatus::Pending && r.reasons == vec![CANCELLED_REASON]));
        assert!(!report.is_ready());
    }

    #[test]
    fn test_cancelled_mid_run() {
        let token = CancellationToken::new();
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(Scripted::new("first", Behaviour::Pass))
            .register(Scripted::new("second", Behaviour::CancelRun(token.clone())).depends_on("first"))
            .register(Scripted::new("third", Behaviour::Pass).depends_on("second"))
            .build()
            .unwrap();

        let report = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::with_token(token), &cluster(), &["third"])
            .unwrap();

        let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ValidationStatus::Success, ValidationStatus::Pending, ValidationStatus::Pending]
        );
        assert!(report.is_cancelled());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_parallel_cancelled_before_start() {
        let registry = diamond(false);
        let token = CancellationToken::new();
        token.cancel();

        let report = ValidationOrchestrator::new(&registry)
            .with_options(OrchestratorOptions::new().with_parallel(true))
            .validate_cluster(&CallContext::with_token(token), &cluster(), &["top"])
            .unwrap();

        assert_eq!(report.outcome, ValidationOutcome::Cancelled);
        assert_eq!(report.pending().count(), 4);
        assert_eq!(report.results[0].validation_id, "base-requirements-satisfied");
    }

    #[test]
    fn test_parallel_cancelled_mid_run() {
        let token = CancellationToken::new();
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(Scripted::new("base", Behaviour::Pass))
            .register(Scripted::new("left", Behaviour::CancelRun(token.clone())).depends_on("base"))
            .register(Scripted::new("right", Behaviour::Pass).depends_on("base"))
            .register(Scripted::new("top", Behaviour::Pass).depends_on("left").depends_on("right"))
            .build()
            .unwrap();

        let report = ValidationOrchestrator::new(&registry)
            .with_options(OrchestratorOptions::new().with_parallel(true))
            .validate_cluster(&CallContext::with_token(token), &cluster(), &["top"])
            .unwrap();

        assert!(report.is_cancelled());
        assert!(report.result("base-requirements-satisfied").unwrap().is_success());
        for id in ["left-requirements-satisfied", "top-requirements-satisfied"] {
            let result = report.result(id).unwrap();
            assert_eq!(result.status, ValidationStatus::Pending);
            assert_eq!(result.reasons, vec![CANCELLED_REASON]);
        }
        // "right" shares a level with "left" and may finish either way,
        // but never as a failure
        assert_eq!(report.failures().count(), 0);
        assert_eq!(report.results.len(), 4);
    }

    #[test]
    fn test_parallel_host_validation() {
        let registry = diamond(true);
        let host = Host::new("w0", HostRole::Worker);
        let requirements = Quantitative::new(1, 1024, 0);
        let ctx = CallContext::new();

        let sequential = ValidationOrchestrator::new(&registry)
            .validate_host(&ctx, &cluster(), &host, &requirements, &["top"])
            .unwrap();
        let parallel = ValidationOrchestrator::new(&registry)
            .with_options(OrchestratorOptions::new().with_parallel(true))
            .validate_host(&ctx, &cluster(), &host, &requirements, &["top"])
            .unwrap();

        assert_eq!(sequential.results, parallel.results);
        assert_eq!(ids(&parallel)[0], "base-host-requirements-satisfied");
        assert_eq!(parallel.failures().count(), 2);

        let token = CancellationToken::new();
        token.cancel();
        let cancelled = ValidationOrchestrator::new(&registry)
            .with_options(OrchestratorOptions::new().with_parallel(true))
            .validate_host(&CallContext::with_token(token), &cluster(), &host, &requirements, &["top"])
            .unwrap();
        assert_eq!(cancelled.outcome, ValidationOutcome::Cancelled);
        assert!(cancelled
            .results
            .iter()
            .all(|r| r.status == ValidationStatus::Pending
                && r.validation_id.ends_with("-host-requirements-satisfied")));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let registry = diamond(true);
        let ctx = CallContext::new();

        let sequential = ValidationOrchestrator::new(&registry)
            .validate_cluster(&ctx, &cluster(), &["top"])
            .unwrap();
        let parallel = ValidationOrchestrator::new(&registry)
            .with_options(OrchestratorOptions::new().with_parallel(true))
            .validate_cluster(&ctx, &cluster(), &["top"])
            .unwrap();

        assert_eq!(sequential.results, parallel.results);
        assert_eq!(sequential.outcome, parallel.outcome);
    }

    #[test]
    fn test_host_ids_and_builtin_rules() {
        let registry = PluginRegistry::with_builtins(&OperatorsConfig::default()).unwrap();
        let host = Host::new("w0", HostRole::Worker).with_inventory(Inventory {
            cpu_cores: 2,
            ram_mib: 4096,
            ..Inventory::default()
        });

        let report = ValidationOrchestrator::new(&registry)
            .validate_host(
                &CallContext::new(),
                &cluster(),
                &host,
                &Quantitative::new(4, 16384, 0),
                &["mce"],
            )
            .unwrap();

        assert_eq!(ids(&report), vec!["mce-requirements-satisfied"]);
        assert_eq!(report.results[0].status, ValidationStatus::Failure);
    }

    #[test]
    fn test_configuration_error_aborts() {
        let registry = diamond(false);
        let error = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::new(), &cluster(), &["ghost"])
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::NotFound { .. }));
    }

    #[test]
    fn test_progress_callback() {
        let registry = diamond(false);
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = completed.clone();
        let options = OrchestratorOptions::new().with_progress(move |update| {
            if let ProgressUpdate::OperatorCompleted { .. } = update {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        ValidationOrchestrator::new(&registry)
            .with_options(options)
            .validate_cluster(&CallContext::new(), &cluster(), &["top"])
            .unwrap();
        assert_eq!(completed.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_static_plugins_pass() {
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(StaticPlugin::builder("dashboard").build())
            .build()
            .unwrap();
        let report = ValidationOrchestrator::new(&registry)
            .validate_cluster(&CallContext::new(), &cluster(), &["dashboard"])
            .unwrap();
        assert!(report.is_ready());
    }
}

//! # Operator Registry - Cluster add-on plugins
//!
//! A registry of optional cluster add-ons ("operators") for an installer.
//! Each operator is a plugin that declares its dependencies, its hardware
//! requirements and its cluster and host checks. The registry resolves a
//! requested set of operators into installation order, the aggregator sums
//! their requirements and the orchestrator runs their checks.
//!
//! ## Features
//!
//! - **Dependency resolution**: Transitive closure with deterministic
//!   ordering and named cycles
//! - **Failure isolation**: One plugin failing does not hide the others'
//!   results
//! - **Cancellation**: Deadlines and tokens propagate into every plugin call
//! - **Configurable**: Built-in operators take their tunables from TOML, and
//!   extra operators can be declared without code
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use operator_registry::prelude::*;
//!
//! let registry = PluginRegistry::with_builtins(&OperatorsConfig::default())?;
//! let cluster = Cluster::new("demo", "4.15").with_operator("nvidia-gpu");
//!
//! // ["node-feature-discovery", "nvidia-gpu"]
//! let order = registry.resolve_order(&cluster, &cluster.operators)?;
//!
//! let ctx = CallContext::new();
//! let totals = RequirementAggregator::new(&registry).aggregate(&ctx, &cluster, &cluster.operators)?;
//! let report = ValidationOrchestrator::new(&registry).validate_cluster(&ctx, &cluster, &cluster.operators)?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Snapshots, requirement types, the plugin trait and errors
//! - [`graph`]: Dependency graph and topology analysis
//! - [`plugins`]: Registry and built-in operators
//! - [`aggregation`]: Requirement aggregation
//! - [`validation`]: Validation orchestrator and reports
//! - [`config`]: Operator configuration

#![warn(clippy::all)]

pub mod aggregation;
pub mod config;
pub mod core;
pub mod graph;
pub mod plugins;
pub mod validation;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use operator_registry::prelude::*;
/// ```
pub mod prelude {
    // Snapshots and requirements
    pub use crate::core::types::{
        Cluster, Disk, FeatureSupportId, Gpu, HardwareRequirements, HighAvailabilityMode, Host,
        HostRole, HostTypeRequirements, Inventory, OperatorDescriptor, OperatorProperty,
        OperatorType, Quantitative,
    };
    pub use crate::core::result::{ValidationResult, ValidationStatus};

    // Plugin contract
    pub use crate::core::context::{CallContext, CancellationToken};
    pub use crate::core::plugin::{validation_id, OperatorPlugin, StaticPlugin};

    // Errors
    pub use crate::core::error::{
        ConfigError, ConfigurationError, OperatorError, OperatorResult, PluginError,
    };

    // Registry
    pub use crate::plugins::builtin::{Lvm, Mce, NodeFeatureDiscovery, NvidiaGpu};
    pub use crate::plugins::registry::{
        PluginRef, PluginRegistry, RegistryBuilder, RegistryEntry, ResolutionPlan,
    };

    // Aggregation and validation
    pub use crate::aggregation::{
        AggregateReport, HostRequirementsBreakdown, OperatorFailure, RequirementAggregator,
    };
    pub use crate::validation::{
        OrchestratorOptions, ProgressUpdate, ValidationOrchestrator, ValidationOutcome,
        ValidationReport,
    };

    pub use crate::config::OperatorsConfig;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

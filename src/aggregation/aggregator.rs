//! Requirement aggregator implementation.

use crate::core::context::CallContext;
use crate::core::error::{ConfigurationResult, PluginError};
use crate::core::types::{Cluster, HardwareRequirements, Host, HostTypeRequirements, Quantitative};
use crate::plugins::registry::PluginRegistry;
use serde::Serialize;

/// A plugin that could not report its requirements.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorFailure {
    pub operator: String,
    pub error: PluginError,
}

/// Cluster-wide requirements of a set of operators.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Sum over every operator that answered.
    pub total: HostTypeRequirements,
    /// Per-operator requirements, in resolved order.
    pub operators: Vec<HardwareRequirements>,
    /// Operators left out of `total`.
    pub errors: Vec<OperatorFailure>,
}

impl AggregateReport {
    /// Whether every operator contributed to the total.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Requirements one host has to meet.
#[derive(Debug, Clone, Serialize)]
pub struct HostRequirementsBreakdown {
    pub hostname: String,
    /// Per-operator demand on this host, in resolved order.
    pub operators: Vec<(String, Quantitative)>,
    pub total: Quantitative,
    pub errors: Vec<OperatorFailure>,
}

impl HostRequirementsBreakdown {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregates requirements across operators.
///
/// Configuration problems (unknown operators, cycles) abort the call.
/// Errors from a single plugin are recorded and the remaining plugins still
/// contribute.
pub struct RequirementAggregator<'a> {
    registry: &'a PluginRegistry,
}

impl<'a> RequirementAggregator<'a> {
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    /// Preflight requirements of `names` and their dependencies.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        names: &[S],
    ) -> ConfigurationResult<AggregateReport> {
        let plugins = self.registry.resolve_order(cluster, names)?;

        let mut report = AggregateReport {
            total: HostTypeRequirements::default(),
            operators: Vec::with_capacity(plugins.len()),
            errors: Vec::new(),
        };

        for plugin in plugins {
            let result = ctx
                .check()
                .and_then(|_| plugin.preflight_requirements(ctx, cluster));
            match result {
                Ok(requirements) => {
                    report.total += &requirements.requirements;
                    report.operators.push(requirements);
                }
                Err(error) => {
                    log::warn!(
                        "Skipping requirements of '{}' for cluster {}: {}",
                        plugin.name(),
                        cluster.id,
                        error
                    );
                    report.errors.push(OperatorFailure {
                        operator: plugin.name().to_string(),
                        error,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Requirements `names` place on one host.
    pub fn host_breakdown<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
        host: &Host,
        names: &[S],
    ) -> ConfigurationResult<HostRequirementsBreakdown> {
        let plugins = self.registry.resolve_order(cluster, names)?;

        let mut breakdown = HostRequirementsBreakdown {
            hostname: host.hostname.clone(),
            operators: Vec::with_capacity(plugins.len()),
            total: Quantitative::default(),
            errors: Vec::new(),
        };

        for plugin in plugins {
            let result = ctx
                .check()
                .and_then(|_| plugin.host_requirements(ctx, cluster, host));
            match result {
                Ok(requirements) => {
                    breakdown.total += &requirements;
                    breakdown.operators.push((plugin.name().to_string(), requirements));
                }
                Err(error) => {
                    log::warn!(
                        "Skipping requirements of '{}' for host {}: {}",
                        plugin.name(),
                        host.hostname,
                        error
                    );
                    breakdown.errors.push(OperatorFailure {
                        operator: plugin.name().to_string(),
                        error,
                    });
                }
            }
        }

        Ok(breakdown)
    }
}

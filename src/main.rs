//! Operator Registry CLI
//!
//! Inspect the registered operators, resolve installation order, and run
//! requirement and validation checks against a cluster snapshot.

use anyhow::{bail, Context, Result};
use operator_registry::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// OpenShift version assumed when no cluster snapshot is given.
const DEFAULT_OPENSHIFT_VERSION: &str = "4.15";

struct Options {
    config: Option<PathBuf>,
    parallel: bool,
    json: bool,
    args: Vec<String>,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("operator-registry").to_string();

    match run(&program, argv.into_iter().skip(1).collect()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            if let Some(config_error) = error.downcast_ref::<ConfigurationError>() {
                if let Some(fix) = config_error.suggested_fix() {
                    eprintln!("  → Suggestion: {}", fix);
                }
            }
            std::process::exit(2);
        }
    }
}

/// Returns whether the command succeeded.
fn run(program: &str, argv: Vec<String>) -> Result<bool> {
    let options = parse_options(argv)?;
    let Some((command, rest)) = options.args.split_first() else {
        print_usage(program);
        return Ok(true);
    };

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage(program);
        return Ok(true);
    }

    let config = match &options.config {
        Some(path) => OperatorsConfig::from_file(path)?,
        None => OperatorsConfig::from_env()?,
    };
    let registry = PluginRegistry::with_builtins(&config)?;

    match command.as_str() {
        "list" => list_operators(&registry),
        "info" => {
            let Some(name) = rest.first() else {
                bail!("Please specify an operator name");
            };
            operator_info(&registry, name)?;
        }
        "order" => {
            if rest.is_empty() {
                bail!("Please specify at least one operator");
            }
            resolve_order(&registry, rest)?;
        }
        "requirements" => {
            let (cluster, names) = cluster_and_operators(rest)?;
            return requirements(&registry, &cluster, &names, options.json);
        }
        "validate" => {
            let (cluster, names) = cluster_and_operators(rest)?;
            return validate(&registry, &cluster, &names, &options);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            return Ok(false);
        }
    }

    Ok(true)
}

fn parse_options(argv: Vec<String>) -> Result<Options> {
    let mut options = Options {
        config: None,
        parallel: false,
        json: false,
        args: Vec::new(),
    };

    let mut iter = argv.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = iter.next() else {
                    bail!("--config needs a file path");
                };
                options.config = Some(PathBuf::from(path));
            }
            "--parallel" => options.parallel = true,
            "--json" => options.json = true,
            _ => options.args.push(arg),
        }
    }

    Ok(options)
}

fn print_usage(program: &str) {
    println!("🧩 Operator Registry v{}", operator_registry::VERSION);
    println!();
    println!("Usage: {} [--config <file.toml>] <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                                 List all registered operators");
    println!("  info <operator>                      Show details about an operator");
    println!("  order <operator>...                  Show installation order");
    println!("  requirements <cluster.json> [op...]  Aggregate hardware requirements");
    println!("  validate <cluster.json> [op...]      Validate the cluster and its hosts");
    println!("  help                                 Show this help message");
    println!();
    println!("Options:");
    println!("  --config <file>   Operator configuration (default: ${})", operator_registry::config::CONFIG_ENV);
    println!("  --parallel        Run independent checks concurrently");
    println!("  --json            Print machine-readable output");
    println!();
    println!("Operators default to the ones requested in the cluster snapshot.");
}

fn list_operators(registry: &PluginRegistry) {
    println!("Registered operators ({} total):", registry.len());
    println!();
    for descriptor in registry.monitored_operators() {
        println!(
            "  • {:<24} {} (namespace: {})",
            descriptor.name, descriptor.display_name, descriptor.namespace
        );
    }
}

fn operator_info(registry: &PluginRegistry, name: &str) -> Result<()> {
    let entry = registry
        .get_entry(name)
        .with_context(|| format!("Operator not found: {}. Use 'list' to see registered operators.", name))?;
    let cluster = Cluster::new("default", DEFAULT_OPENSHIFT_VERSION);
    let preflight = entry.plugin.preflight_requirements(&CallContext::new(), &cluster)?;
    let descriptor = &entry.descriptor;

    println!("Operator: {}", entry.plugin.full_name());
    println!("Name: {}", descriptor.name);
    println!("Namespace: {}", descriptor.namespace);
    if let Some(subscription) = &descriptor.subscription_name {
        println!("Subscription: {}", subscription);
    }
    println!("Install timeout: {}s", descriptor.timeout_seconds);
    println!("Feature support: {}", entry.feature_support_id);
    println!("Cluster check: {}", entry.plugin.cluster_validation_id());
    println!("Host check: {}", entry.plugin.host_validation_id());
    println!();

    if !preflight.dependencies.is_empty() {
        println!("Dependencies:");
        for dependency in &preflight.dependencies {
            println!("  • {}", dependency);
        }
        println!();
    }

    println!("Requirements (OpenShift {}):", DEFAULT_OPENSHIFT_VERSION);
    println!("  master: {}", preflight.requirements.master);
    println!("  worker: {}", preflight.requirements.worker);

    let properties = entry.plugin.properties();
    if !properties.is_empty() {
        println!();
        println!("Properties:");
        for property in &properties {
            let mandatory = if property.mandatory { " (mandatory)" } else { "" };
            println!("  • {} [{}]{}", property.name, property.data_type, mandatory);
            if !property.description.is_empty() {
                println!("    {}", property.description);
            }
        }
    }

    Ok(())
}

fn resolve_order(registry: &PluginRegistry, names: &[String]) -> Result<()> {
    let cluster = Cluster::new("default", DEFAULT_OPENSHIFT_VERSION);
    let plan = registry.resolve_plan(&cluster, names)?;

    println!("Installation order:");
    for (position, name) in plan.names().iter().enumerate() {
        println!("  {}. {}", position + 1, name);
    }
    println!();
    println!("Levels:");
    for (depth, level) in plan.levels.iter().enumerate() {
        let level: Vec<&str> = level.iter().map(|&i| plan.plugins[i].name()).collect();
        println!("  {}: {}", depth, level.join(", "));
    }
    Ok(())
}

fn load_cluster(path: &Path) -> Result<Cluster> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid cluster snapshot {}", path.display()))
}

fn cluster_and_operators(args: &[String]) -> Result<(Cluster, Vec<String>)> {
    let Some((path, names)) = args.split_first() else {
        bail!("Please specify a cluster snapshot (JSON)");
    };
    let cluster = load_cluster(Path::new(path))?;
    let names = if names.is_empty() {
        cluster.operators.clone()
    } else {
        names.to_vec()
    };
    Ok((cluster, names))
}

fn requirements(registry: &PluginRegistry, cluster: &Cluster, names: &[String], json: bool) -> Result<bool> {
    let ctx = CallContext::new();
    let aggregator = RequirementAggregator::new(registry);
    let report = aggregator.aggregate(&ctx, cluster, names)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_complete());
    }

    println!("Requirements for cluster '{}':", cluster.name);
    println!();
    for operator in &report.operators {
        println!("  • {}", operator.operator_name);
        println!("      master: {}", operator.requirements.master);
        println!("      worker: {}", operator.requirements.worker);
    }
    println!();
    println!("Total per master: {}", report.total.master);
    println!("Total per worker: {}", report.total.worker);

    for host in &cluster.hosts {
        let breakdown = aggregator.host_breakdown(&ctx, cluster, host, names)?;
        println!("Host {}: {}", breakdown.hostname, breakdown.total);
    }

    if !report.is_complete() {
        println!();
        println!("Missing from totals:");
        for failure in &report.errors {
            println!("  ✗ {}: {}", failure.operator, failure.error);
        }
    }

    Ok(report.is_complete())
}

/// Validation report for the cluster or one of its hosts.
#[derive(Debug, Serialize)]
struct TargetReport {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_id: Option<Uuid>,
    report: ValidationReport,
}

/// Validate the cluster, then every host against the requirements the
/// selected operators place on it.
fn validation_reports(
    registry: &PluginRegistry,
    cluster: &Cluster,
    names: &[String],
    parallel: bool,
) -> Result<Vec<TargetReport>> {
    let ctx = CallContext::new();
    let aggregator = RequirementAggregator::new(registry);
    let orchestrator = ValidationOrchestrator::new(registry)
        .with_options(OrchestratorOptions::new().with_parallel(parallel));

    let mut reports = vec![TargetReport {
        target: "cluster".to_string(),
        host_id: None,
        report: orchestrator.validate_cluster(&ctx, cluster, names)?,
    }];

    for host in &cluster.hosts {
        let breakdown = aggregator.host_breakdown(&ctx, cluster, host, names)?;
        let mut report = orchestrator.validate_host(&ctx, cluster, host, &breakdown.total, names)?;
        mark_unknown_requirements(registry, &mut report, &breakdown.errors)?;

        let hostname = if host.hostname.is_empty() { "<unnamed>" } else { &host.hostname };
        reports.push(TargetReport {
            target: format!("host {} ({})", hostname, host.id),
            host_id: Some(host.id),
            report,
        });
    }

    Ok(reports)
}

/// Fail the rows of operators whose host requirements could not be computed.
///
/// The host was checked against a total missing their share, so their own
/// verdict cannot be trusted.
fn mark_unknown_requirements(
    registry: &PluginRegistry,
    report: &mut ValidationReport,
    failures: &[OperatorFailure],
) -> Result<()> {
    for failure in failures.iter().filter(|f| !f.error.is_cancelled()) {
        let validation_id = registry.get(&failure.operator)?.host_validation_id();
        let row = ValidationResult::failure(
            validation_id.clone(),
            [format!("Cannot compute host requirements: {}", failure.error)],
        );
        match report.results.iter_mut().find(|r| r.validation_id == validation_id) {
            Some(existing) => *existing = row,
            None => report.results.push(row),
        }
    }
    Ok(())
}

fn validate(registry: &PluginRegistry, cluster: &Cluster, names: &[String], options: &Options) -> Result<bool> {
    let reports = validation_reports(registry, cluster, names, options.parallel)?;
    let ready = reports.iter().all(|r| r.report.is_ready());

    if options.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(ready);
    }

    for target in &reports {
        println!("{}: {}", target.target, target.report.summary());
        for line in target.report.detailed_reasons() {
            println!("   {}", line);
        }
    }

    Ok(ready)
}

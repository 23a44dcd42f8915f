//! Error types for the operator registry.
//!
//! Uses thiserror for structured errors with context. Errors fall into three
//! groups:
//! - Configuration errors: duplicate names, cyclic or missing dependencies.
//!   Fatal for the call that hits them.
//! - Plugin errors: a single plugin's lookup failed. Isolated to that plugin.
//! - Validation failures are not errors at all; they are carried as data in
//!   [`ValidationResult`](crate::core::result::ValidationResult).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the crate.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Config file error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors in how the set of operators is put together.
///
/// These are never recovered from: the resolve, aggregate or validate call
/// that hits one is aborted and the error is surfaced as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationError {
    #[error("Operator '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("Operator '{name}' not found")]
    NotFound { name: String },

    #[error("Cyclic dependency between operators: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Missing dependency '{dependency}' required by operator '{required_by}'")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },

    #[error("Validation ID '{id}' is shared by operators {operators:?}")]
    DuplicateValidationId { id: String, operators: Vec<String> },

    #[error("Cannot determine dependencies of operator '{operator}': {message}")]
    DependencyLookup { operator: String, message: String },
}

/// Infrastructure failures raised by a plugin.
///
/// A plugin returns these when it could not reach a verdict at all (an
/// inventory lookup failed, the call was cancelled). A plugin that did reach
/// a verdict and found the cluster lacking returns a successful
/// `ValidationResult` with `Failure` status instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginError {
    #[error("Operator '{operator}' lookup failed: {message}")]
    Infrastructure { operator: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors while loading the operators configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ConfigurationError {
    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ConfigurationError::DuplicateName { name } => Some(format!(
                "Register '{}' only once, or rename one of the plugins",
                name
            )),
            ConfigurationError::NotFound { name } => Some(format!(
                "Check the spelling of '{}' or register a plugin for it",
                name
            )),
            ConfigurationError::MissingDependency { dependency, .. } => Some(format!(
                "Register a plugin named '{}'",
                dependency
            )),
            ConfigurationError::CyclicDependency { cycle } => cycle.first().map(|first| {
                format!("Remove one of the dependencies on the path starting at '{}'", first)
            }),
            ConfigurationError::DuplicateValidationId { id, .. } => Some(format!(
                "Give every plugin its own '{}' style identifier",
                id
            )),
            ConfigurationError::DependencyLookup { .. } => None,
        }
    }

    /// Get the operators this error is about.
    pub fn affected_operators(&self) -> Vec<String> {
        match self {
            ConfigurationError::DuplicateName { name }
            | ConfigurationError::NotFound { name } => vec![name.clone()],
            ConfigurationError::MissingDependency { required_by, .. } => vec![required_by.clone()],
            ConfigurationError::CyclicDependency { cycle } => {
                let mut operators = cycle.clone();
                operators.dedup();
                if operators.len() > 1 && operators.first() == operators.last() {
                    operators.pop();
                }
                operators
            }
            ConfigurationError::DuplicateValidationId { operators, .. } => operators.clone(),
            ConfigurationError::DependencyLookup { operator, .. } => vec![operator.clone()],
        }
    }
}

impl PluginError {
    /// Shorthand for an infrastructure failure of `operator`.
    pub fn infrastructure(operator: impl Into<String>, message: impl Into<String>) -> Self {
        PluginError::Infrastructure {
            operator: operator.into(),
            message: message.into(),
        }
    }

    /// Check if this error came from cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PluginError::Cancelled)
    }
}

/// Result type alias for crate operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Result type alias for registry and resolution operations.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display() {
        let error = ConfigurationError::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Cyclic dependency between operators: a -> b -> a"
        );
        assert_eq!(error.affected_operators(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_dependency_suggestion() {
        let error = ConfigurationError::MissingDependency {
            dependency: "node-feature-discovery".to_string(),
            required_by: "nvidia-gpu".to_string(),
        };
        assert!(error
            .suggested_fix()
            .unwrap()
            .contains("node-feature-discovery"));
        assert_eq!(error.affected_operators(), vec!["nvidia-gpu"]);
    }

    #[test]
    fn test_self_cycle_affects_one_operator() {
        let error = ConfigurationError::CyclicDependency {
            cycle: vec!["a".to_string(), "a".to_string()],
        };
        assert_eq!(error.affected_operators(), vec!["a"]);
    }

    #[test]
    fn test_conversion_into_top_level() {
        let error: OperatorError = PluginError::Cancelled.into();
        assert!(matches!(error, OperatorError::Plugin(PluginError::Cancelled)));

        let errors: Vec<OperatorError> = vec![
            ConfigurationError::NotFound { name: "ghost".to_string() }.into(),
            ConfigError::Io {
                path: "operators.toml".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            }
            .into(),
            std::io::Error::new(std::io::ErrorKind::Other, "disk").into(),
            serde_json::from_str::<serde_json::Value>("{").unwrap_err().into(),
        ];
        for error in &errors {
            match error {
                OperatorError::Configuration(_)
                | OperatorError::Plugin(_)
                | OperatorError::Config(_)
                | OperatorError::Io(_)
                | OperatorError::Serialization(_) => {}
            }
        }
        assert!(errors[0].to_string().contains("ghost"));
    }
}

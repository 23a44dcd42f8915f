//! Validation reports.

use crate::core::result::{ValidationResult, ValidationStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a validation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    /// Every selected plugin was called.
    Completed,
    /// The run was cancelled; some results are `Pending`.
    Cancelled,
}

/// Results of validating one cluster or host against a set of operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Identifier of this run, for correlating log lines.
    pub run_id: Uuid,
    /// One result per operator, in resolved dependency order.
    pub results: Vec<ValidationResult>,
    pub outcome: ValidationOutcome,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>, outcome: ValidationOutcome, duration_ms: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            results,
            outcome,
            duration_ms,
        }
    }

    /// Whether the target may proceed to installation.
    ///
    /// A cancelled run is never ready, even if every result it holds passed.
    pub fn is_ready(&self) -> bool {
        self.outcome == ValidationOutcome::Completed && self.results.iter().all(|r| r.is_success())
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == ValidationOutcome::Cancelled
    }

    /// Results with `Failure` status.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.with_status(ValidationStatus::Failure)
    }

    /// Results with `Pending` status.
    pub fn pending(&self) -> impl Iterator<Item = &ValidationResult> {
        self.with_status(ValidationStatus::Pending)
    }

    fn with_status(&self, status: ValidationStatus) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(move |r| r.status == status)
    }

    /// Look up a result by validation id.
    pub fn result(&self, validation_id: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.validation_id == validation_id)
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        let failures = self.failures().count();
        let pending = self.pending().count();

        if self.is_cancelled() {
            format!(
                "⚠ Validation cancelled with {} pending check(s) and {} failure(s)",
                pending, failures
            )
        } else if self.is_ready() {
            format!("✓ All {} check(s) passed", self.results.len())
        } else if failures > 0 {
            format!("✗ Validation failed with {} failure(s)", failures)
        } else {
            format!("… {} check(s) pending", pending)
        }
    }

    /// Failure and pending reasons, one numbered line per reason.
    pub fn detailed_reasons(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .flat_map(|r| r.reasons.iter().map(move |reason| (r, reason)))
            .enumerate()
            .map(|(i, (r, reason))| format!("{}. [{}] {}: {}", i + 1, r.status, r.validation_id, reason))
            .collect()
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

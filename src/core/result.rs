//! Per-plugin validation results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Failure,
    /// The check has not produced a verdict (not run yet, or cancelled).
    Pending,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Success => write!(f, "success"),
            ValidationStatus::Failure => write!(f, "failure"),
            ValidationStatus::Pending => write!(f, "pending"),
        }
    }
}

/// Result of one plugin's cluster or host check.
///
/// Keyed by `validation_id`, which is stable across releases
/// (`<domain>-requirements-satisfied`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub validation_id: String,
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn success(validation_id: impl Into<String>) -> Self {
        Self {
            validation_id: validation_id.into(),
            status: ValidationStatus::Success,
            reasons: Vec::new(),
        }
    }

    /// A failing result with reasons.
    pub fn failure(
        validation_id: impl Into<String>,
        reasons: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            validation_id: validation_id.into(),
            status: ValidationStatus::Failure,
            reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }

    /// A result with no verdict.
    pub fn pending(validation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            validation_id: validation_id.into(),
            status: ValidationStatus::Pending,
            reasons: vec![reason.into()],
        }
    }

    /// Success when `reasons` is empty, failure otherwise.
    pub fn from_reasons(validation_id: impl Into<String>, reasons: Vec<String>) -> Self {
        let status = if reasons.is_empty() {
            ValidationStatus::Success
        } else {
            ValidationStatus::Failure
        };
        Self {
            validation_id: validation_id.into(),
            status,
            reasons,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }
}

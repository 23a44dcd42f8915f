//! Validation of clusters and hosts against selected operators.
//!
//! The orchestrator resolves the requested operators, calls each plugin's
//! check in dependency order and turns infrastructure errors and
//! cancellation into report rows instead of aborting.

pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::{OrchestratorOptions, ValidationOrchestrator, CANCELLED_REASON};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
pub use report::{ValidationOutcome, ValidationReport};

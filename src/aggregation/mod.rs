//! Requirement aggregation.
//!
//! Sums the hardware demand of a set of operators, isolating plugins that
//! fail so one broken add-on does not hide the others' requirements.

pub mod aggregator;

pub use aggregator::{AggregateReport, HostRequirementsBreakdown, OperatorFailure, RequirementAggregator};

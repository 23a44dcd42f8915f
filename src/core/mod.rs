//! Core types and traits for the operator registry.
//!
//! This module contains the foundational pieces everything else builds on:
//! - Inbound snapshots and requirement types
//! - The plugin capability contract
//! - Validation results
//! - Call context (cancellation, deadlines)
//! - Error types

pub mod types;
pub mod result;
pub mod error;
pub mod context;
pub mod plugin;

// Re-export commonly used types
pub use types::{
    Cluster, FeatureSupportId, HardwareRequirements, Host, HostRole, HostTypeRequirements,
    Inventory, OperatorDescriptor, OperatorProperty, Quantitative,
};
pub use result::{ValidationResult, ValidationStatus};
pub use error::{ConfigurationError, OperatorError, PluginError};
pub use context::{CallContext, CancellationToken};
pub use plugin::{OperatorPlugin, StaticPlugin};

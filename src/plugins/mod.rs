//! Plugin module.
//!
//! Contains the plugin registry and built-in operator implementations.

pub mod registry;
pub mod builtin;

pub use registry::{PluginRef, PluginRegistry, RegistryBuilder, RegistryEntry, ResolutionPlan};

//! Graph module for operator dependencies.
//!
//! A dependency graph is a directed graph where nodes are operators and an
//! edge points from an operator to one it depends on. It is rebuilt for
//! every request and must be acyclic.

pub mod structure;
pub mod topology;

// Re-export commonly used types
pub use structure::{DependencyGraph, GraphIndex};
pub use topology::TopologyAnalyzer;

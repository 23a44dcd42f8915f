//! Dependency graph construction.
//!
//! The graph is derived on demand from the plugins' declared dependencies
//! and never stored in the registry. Nodes are interned as registry indices
//! so ordering can be tied back to registration order.

use crate::core::error::{ConfigurationError, ConfigurationResult};
use crate::core::types::Cluster;
use crate::plugins::registry::PluginRegistry;
use std::collections::{HashMap, VecDeque};

/// Index of a node inside one [`DependencyGraph`].
pub type GraphIndex = usize;

/// Directed graph over the operators relevant to one request.
///
/// Holds the requested operators plus everything they transitively depend
/// on. Edges point from an operator to the operators it depends on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Operator name per node.
    names: Vec<String>,
    /// Registry index per node (registration order).
    entries: Vec<usize>,
    /// Outgoing edges: the operators each node depends on.
    dependencies: Vec<Vec<GraphIndex>>,
    /// Incoming edges: the operators depending on each node.
    dependents: Vec<Vec<GraphIndex>>,
    /// Registry index to node.
    by_entry: HashMap<usize, GraphIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for `names` and their transitive dependencies.
    ///
    /// Fails with `NotFound` for an unknown requested operator,
    /// `MissingDependency` for an unknown dependency and `DependencyLookup`
    /// if a plugin cannot compute its dependency list. Cycles are not
    /// rejected here; see [`TopologyAnalyzer`](crate::graph::TopologyAnalyzer).
    pub fn build<S: AsRef<str>>(
        registry: &PluginRegistry,
        cluster: &Cluster,
        names: &[S],
    ) -> ConfigurationResult<Self> {
        let mut graph = Self::new();
        let mut queue = VecDeque::new();

        for name in names {
            let name = name.as_ref();
            let entry = registry
                .index_of(name)
                .ok_or_else(|| ConfigurationError::NotFound {
                    name: name.to_string(),
                })?;
            let (node, added) = graph.intern(entry, name);
            if added {
                queue.push_back(node);
            }
        }

        while let Some(node) = queue.pop_front() {
            let entry = graph.entries[node];
            let plugin = registry
                .entry_at(entry)
                .map(|e| e.plugin.clone())
                .ok_or_else(|| ConfigurationError::NotFound {
                    name: graph.names[node].clone(),
                })?;

            let declared = plugin.dependencies(cluster).map_err(|error| {
                ConfigurationError::DependencyLookup {
                    operator: graph.names[node].clone(),
                    message: error.to_string(),
                }
            })?;

            for dependency in declared {
                let dep_entry = registry.index_of(&dependency).ok_or_else(|| {
                    ConfigurationError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: graph.names[node].clone(),
                    }
                })?;
                let (dep_node, added) = graph.intern(dep_entry, &dependency);
                if added {
                    queue.push_back(dep_node);
                }
                graph.add_edge(node, dep_node);
            }
        }

        Ok(graph)
    }

    /// Add a node for a registry entry if it is not present yet.
    ///
    /// Returns the node and whether it was newly added.
    fn intern(&mut self, entry: usize, name: &str) -> (GraphIndex, bool) {
        if let Some(&node) = self.by_entry.get(&entry) {
            return (node, false);
        }
        let node = self.names.len();
        self.names.push(name.to_string());
        self.entries.push(entry);
        self.dependencies.push(Vec::new());
        self.dependents.push(Vec::new());
        self.by_entry.insert(entry, node);
        (node, true)
    }

    /// Record that `from` depends on `to`. Repeated edges are ignored.
    fn add_edge(&mut self, from: GraphIndex, to: GraphIndex) {
        if !self.dependencies[from].contains(&to) {
            self.dependencies[from].push(to);
            self.dependents[to].push(from);
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All node indices.
    pub fn nodes(&self) -> impl Iterator<Item = GraphIndex> {
        0..self.names.len()
    }

    /// Operator name of a node.
    pub fn name(&self, node: GraphIndex) -> &str {
        &self.names[node]
    }

    /// Registry index of a node; lower means registered earlier.
    pub fn registration_rank(&self, node: GraphIndex) -> usize {
        self.entries[node]
    }

    /// Find a node by operator name.
    pub fn find(&self, name: &str) -> Option<GraphIndex> {
        self.names.iter().position(|n| n == name)
    }

    /// Operators a node depends on.
    pub fn dependencies_of(&self, node: GraphIndex) -> &[GraphIndex] {
        &self.dependencies[node]
    }

    /// Operators depending on a node.
    pub fn dependents_of(&self, node: GraphIndex) -> &[GraphIndex] {
        &self.dependents[node]
    }

    /// Iterate over all edges as (dependent, dependency).
    pub fn edges(&self) -> impl Iterator<Item = (GraphIndex, GraphIndex)> + '_ {
        self.dependencies
            .iter()
            .enumerate()
            .flat_map(|(from, deps)| deps.iter().map(move |&to| (from, to)))
    }
}

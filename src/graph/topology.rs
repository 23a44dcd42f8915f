//! Topological analysis and sorting of dependency graphs.
//!
//! Provides algorithms for:
//! - Topological sorting (installation and validation order)
//! - Parallel level identification
//! - Cycle extraction

use crate::core::error::{ConfigurationError, ConfigurationResult};
use crate::graph::structure::{DependencyGraph, GraphIndex};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Analyzer for graph topology.
pub struct TopologyAnalyzer<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> TopologyAnalyzer<'a> {
    /// Create a new analyzer for the given graph.
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Get the topological sort order (Kahn's algorithm).
    ///
    /// Returns nodes in an order where dependencies come before dependents.
    /// Among nodes that are ready at the same time, the one registered
    /// first goes first.
    pub fn topological_sort(&self) -> ConfigurationResult<Vec<GraphIndex>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .nodes()
            .map(|node| self.graph.dependencies_of(node).len())
            .collect();

        // Min-heap on registration rank
        let mut ready: BinaryHeap<Reverse<(usize, GraphIndex)>> = self
            .graph
            .nodes()
            .filter(|&node| in_degree[node] == 0)
            .map(|node| Reverse((self.graph.registration_rank(node), node)))
            .collect();

        let mut result = Vec::with_capacity(self.graph.node_count());

        while let Some(Reverse((_, node))) = ready.pop() {
            result.push(node);

            for &dependent in self.graph.dependents_of(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse((self.graph.registration_rank(dependent), dependent)));
                }
            }
        }

        if result.len() != self.graph.node_count() {
            let cycle = self
                .find_cycle()
                .unwrap_or_default()
                .into_iter()
                .map(|node| self.graph.name(node).to_string())
                .collect();
            return Err(ConfigurationError::CyclicDependency { cycle });
        }

        Ok(result)
    }

    /// Group nodes into levels that can be processed in parallel.
    ///
    /// Nodes in one level have no dependency path between them, and every
    /// node's dependencies sit in earlier levels. Within a level, nodes keep
    /// their topological order.
    pub fn parallel_batches(&self) -> ConfigurationResult<Vec<Vec<GraphIndex>>> {
        let sorted = self.topological_sort()?;
        Ok(self.batches_of(&sorted))
    }

    /// Levels for an order already produced by
    /// [`topological_sort`](Self::topological_sort).
    pub fn batches_of(&self, sorted: &[GraphIndex]) -> Vec<Vec<GraphIndex>> {
        let mut depth: HashMap<GraphIndex, usize> = HashMap::new();
        let mut batches: Vec<Vec<GraphIndex>> = Vec::new();

        for &node in sorted {
            let node_depth = self
                .graph
                .dependencies_of(node)
                .iter()
                .filter_map(|dep| depth.get(dep))
                .max()
                .map(|d| d + 1)
                .unwrap_or(0);

            depth.insert(node, node_depth);
            if batches.len() <= node_depth {
                batches.resize_with(node_depth + 1, Vec::new);
            }
            batches[node_depth].push(node);
        }

        batches
    }

    /// Check if the graph has any cycles.
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Find one cycle as a closed path of nodes.
    ///
    /// The path starts and ends at the earliest-registered node of the
    /// cycle and follows dependency edges, so `[a, b, a]` reads "a depends
    /// on b, which depends on a". A self-dependency yields `[a, a]`.
    pub fn find_cycle(&self) -> Option<Vec<GraphIndex>> {
        let mut pg: DiGraph<GraphIndex, ()> = DiGraph::with_capacity(
            self.graph.node_count(),
            self.graph.edges().count(),
        );
        let indices: Vec<NodeIndex> = self.graph.nodes().map(|node| pg.add_node(node)).collect();
        for (from, to) in self.graph.edges() {
            pg.add_edge(indices[from], indices[to], ());
        }

        let rank = |node: &GraphIndex| self.graph.registration_rank(*node);

        let component = tarjan_scc(&pg)
            .into_iter()
            .map(|scc| scc.into_iter().map(|ix| pg[ix]).collect::<Vec<_>>())
            .filter(|scc| {
                scc.len() > 1 || self.graph.dependencies_of(scc[0]).contains(&scc[0])
            })
            .min_by_key(|scc| scc.iter().map(rank).min())?;

        let start = component.iter().copied().min_by_key(rank)?;
        self.closed_path(start, &component.into_iter().collect())
    }

    /// Shortest path from `start` back to itself inside `members`.
    fn closed_path(
        &self,
        start: GraphIndex,
        members: &HashSet<GraphIndex>,
    ) -> Option<Vec<GraphIndex>> {
        let mut parent: HashMap<GraphIndex, GraphIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<GraphIndex> = self
                .graph
                .dependencies_of(current)
                .iter()
                .copied()
                .filter(|n| members.contains(n))
                .collect();
            next.sort_by_key(|&n| self.graph.registration_rank(n));

            for neighbor in next {
                if neighbor == start {
                    let mut inner = Vec::new();
                    let mut node = current;
                    while node != start {
                        inner.push(node);
                        node = parent[&node];
                    }
                    inner.reverse();

                    let mut path = Vec::with_capacity(inner.len() + 2);
                    path.push(start);
                    path.extend(inner);
                    path.push(start);
                    return Some(path);
                }
                if !parent.contains_key(&neighbor) {
                    parent.insert(neighbor, current);
                    queue.push_back(neighbor);
                }
            }
        }

        None
    }
}

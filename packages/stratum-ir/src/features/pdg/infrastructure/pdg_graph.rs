//! Program Dependence Graph
//!
//! petgraph-backed structure over the serializable PdgNode/PdgEdge
//! records: O(1) node lookup through the id map, O(V+E) slicing
//! traversals.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::shared::models::{DependencyType, PdgEdge, PdgNode};

#[derive(Debug, Default)]
pub struct ProgramDependenceGraph {
    graph: DiGraph<PdgNode, PdgEdge>,
    node_map: HashMap<String, NodeIndex>,
    pub function_id: String,
}

impl ProgramDependenceGraph {
    pub fn new(function_id: impl Into<String>) -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            function_id: function_id.into(),
        }
    }

    pub fn add_node(&mut self, node: PdgNode) -> NodeIndex {
        let node_id = node.node_id.clone();
        let index = self.graph.add_node(node);
        self.node_map.insert(node_id, index);
        index
    }

    /// Edges between unknown nodes are dropped
    pub fn add_edge(&mut self, edge: PdgEdge) {
        let from = self.node_map.get(&edge.from_node);
        let to = self.node_map.get(&edge.to_node);
        if let (Some(&from), Some(&to)) = (from, to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node_map.contains_key(node_id)
    }

    pub fn get_node(&self, node_id: &str) -> Option<&PdgNode> {
        self.node_map
            .get(node_id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PdgNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &PdgEdge> {
        self.graph.edge_weights()
    }

    /// Incoming dependencies of a node
    pub fn get_dependencies(&self, node_id: &str) -> Vec<&PdgEdge> {
        let Some(&index) = self.node_map.get(node_id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Incoming)
            .map(|e| e.weight())
            .collect()
    }

    /// Outgoing dependents of a node
    pub fn get_dependents(&self, node_id: &str) -> Vec<&PdgEdge> {
        let Some(&index) = self.node_map.get(node_id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|e| e.weight())
            .collect()
    }

    /// Backward slice: everything that affects `target`.
    pub fn backward_slice(&self, target: &str, max_depth: Option<usize>) -> HashSet<String> {
        self.slice(target, max_depth, Direction::Incoming, true, true)
    }

    /// Forward slice: everything `source` affects.
    pub fn forward_slice(&self, source: &str, max_depth: Option<usize>) -> HashSet<String> {
        self.slice(source, max_depth, Direction::Outgoing, true, true)
    }

    /// Dependency-filtered slice. `include_control=false` yields a thin
    /// slice (data dependencies only).
    pub fn slice_filtered(
        &self,
        start: &str,
        max_depth: Option<usize>,
        backward: bool,
        include_control: bool,
        include_data: bool,
    ) -> HashSet<String> {
        let direction = if backward {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        self.slice(start, max_depth, direction, include_control, include_data)
    }

    fn slice(
        &self,
        start: &str,
        max_depth: Option<usize>,
        direction: Direction,
        include_control: bool,
        include_data: bool,
    ) -> HashSet<String> {
        let max_depth = max_depth.unwrap_or(usize::MAX);
        let mut result = HashSet::new();
        let mut visited = HashSet::new();
        let mut worklist: VecDeque<(String, usize)> = VecDeque::new();
        worklist.push_back((start.to_string(), 0));

        while let Some((current, depth)) = worklist.pop_front() {
            if depth > max_depth || !visited.insert(current.clone()) {
                continue;
            }
            result.insert(current.clone());

            let Some(&index) = self.node_map.get(&current) else {
                continue;
            };
            for edge in self.graph.edges_directed(index, direction) {
                let weight = edge.weight();
                let keep = match weight.dependency_type {
                    DependencyType::Control => include_control,
                    DependencyType::Data => include_data,
                };
                if !keep {
                    continue;
                }
                let next = match direction {
                    Direction::Incoming => weight.from_node.clone(),
                    Direction::Outgoing => weight.to_node.clone(),
                };
                if !visited.contains(&next) {
                    worklist.push_back((next, depth + 1));
                }
            }
        }

        result
    }

    /// BFS path over data dependencies between two nodes
    pub fn find_dataflow_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let mut queue: VecDeque<(String, Vec<String>)> = VecDeque::new();
        let mut visited = HashSet::new();
        queue.push_back((from.to_string(), vec![from.to_string()]));

        while let Some((current, path)) = queue.pop_front() {
            if current == to {
                return Some(path);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            for edge in self.get_dependents(&current) {
                if edge.dependency_type == DependencyType::Data && !visited.contains(&edge.to_node)
                {
                    let mut next_path = path.clone();
                    next_path.push(edge.to_node.clone());
                    queue.push_back((edge.to_node.clone(), next_path));
                }
            }
        }
        None
    }
}

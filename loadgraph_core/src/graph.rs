//! The graph model: components plus directed request-flow edges.
//!
//! Structural queries never fail. An unknown id yields an empty result so
//! the engine can stay tolerant of malformed input.

use crate::error::GraphError;
use crate::types::{Edge, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A snapshot of nodes and edges, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Components, in insertion order
    #[serde(default)]
    pub nodes: Vec<Node>,

    /// Flow relations, in insertion order
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph from parts without validating them.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Parses a graph from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the graph as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns true if a node with this id exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Targets of every edge leaving `id`, in edge-insertion order.
    pub fn outgoing(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target)
            .collect()
    }

    /// True iff some edge targets `id`.
    pub fn has_incoming(&self, id: NodeId) -> bool {
        self.edges.iter().any(|e| e.target == id)
    }

    /// Every node without incoming edges, in node order.
    ///
    /// A node with no edges at all is an entry node.
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        let targets: HashSet<NodeId> = self.edges.iter().map(|e| e.target).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(&n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Builds the full adjacency map once, preserving edge order per source.
    pub(crate) fn adjacency(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.source).or_default().push(edge.target);
        }
        adjacency
    }

    /// Returns the nodes that cannot be topologically ordered, in node order.
    ///
    /// That is every node on a cycle plus everything downstream of one.
    /// Edges with a missing endpoint are ignored.
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let known: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        let mut in_degree: HashMap<NodeId, usize> = known.iter().map(|id| (*id, 0)).collect();
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for edge in &self.edges {
            if !known.contains(&edge.source) || !known.contains(&edge.target) {
                continue;
            }
            adjacency.entry(edge.source).or_default().push(edge.target);
            *in_degree.entry(edge.target).or_default() += 1;
        }

        let mut queue: VecDeque<NodeId> = self
            .nodes
            .iter()
            .filter(|n| in_degree.get(&n.id) == Some(&0))
            .map(|n| n.id)
            .collect();
        let mut removed: HashSet<NodeId> = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if !removed.insert(id) {
                continue;
            }
            for child in adjacency.get(&id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        let remaining: Vec<NodeId> = self
            .nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !removed.contains(id))
            .collect();

        if remaining.is_empty() {
            None
        } else {
            Some(remaining)
        }
    }

    /// Returns true if no cycle exists among known nodes.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    /// Checks the invariants the engine assumes but does not enforce.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            if !(node.capacity.is_finite() && node.capacity > 0.0) {
                return Err(GraphError::InvalidCapacity {
                    id: node.id,
                    capacity: node.capacity,
                });
            }
        }

        for edge in &self.edges {
            if !seen.contains(&edge.source) || !seen.contains(&edge.target) {
                return Err(GraphError::DanglingEdge {
                    from: edge.source,
                    to: edge.target,
                });
            }
        }

        Ok(())
    }
}

//! Editor session: owns a graph, its id generator and the latest annotation.
//!
//! Structural edits keep the graph invariants the engine relies on:
//! edges only reference existing nodes, and removing a node removes every
//! edge that touches it.

use crate::config::SimulationConfig;
use crate::engine::{simulate, SimulationResult};
use crate::error::{GraphError, SimulationError};
use crate::graph::Graph;
use crate::types::{Edge, Node, NodeId, NodeKind};
use tracing::debug;

/// Monotonic id source scoped to one session.
///
/// Ids never wrap: once `u64::MAX` would be reached the generator refuses
/// to hand out anything further.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    /// Creates a generator whose first id is 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Creates a generator that never reissues an id already in `graph`.
    ///
    /// Fails if the largest id in use leaves no room above it.
    pub fn after(graph: &Graph) -> Result<Self, GraphError> {
        let Some(max) = graph.nodes.iter().map(|n| n.id).max() else {
            return Ok(Self::new());
        };
        let next = max.0.checked_add(1).ok_or(GraphError::IdSpaceExhausted(max))?;
        Ok(Self { next })
    }

    /// Returns the next id.
    ///
    /// The generator is left untouched on failure.
    pub fn next_id(&mut self) -> Result<NodeId, GraphError> {
        let id = NodeId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .ok_or(GraphError::IdSpaceExhausted(id))?;
        Ok(id)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// An editing session over one graph.
#[derive(Debug, Clone, Default)]
pub struct GraphSession {
    graph: Graph,
    ids: IdGenerator,
    selected: Option<NodeId>,
    last_result: Option<SimulationResult>,
}

impl GraphSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session holding a single API server, the usual blank canvas.
    pub fn starter() -> Self {
        let mut session = Self::new();
        session.insert(Node::from_kind(NodeId(1), NodeKind::Api));
        session.ids = IdGenerator { next: 2 };
        session
    }

    /// Opens a session over an existing graph.
    pub fn from_graph(graph: Graph) -> Result<Self, GraphError> {
        graph.validate()?;
        let ids = IdGenerator::after(&graph)?;
        Ok(Self {
            graph,
            ids,
            selected: None,
            last_result: None,
        })
    }

    /// Returns the current graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the currently selected node.
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Returns the annotation from the latest run, if still current.
    pub fn last_result(&self) -> Option<&SimulationResult> {
        self.last_result.as_ref()
    }

    /// Adds a node with its kind's defaults.
    ///
    /// When a node is selected, an edge from it to the new node is added too.
    /// Fails only once the id space is exhausted.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        let id = self.ids.next_id()?;
        self.insert(Node::from_kind(id, kind));
        Ok(id)
    }

    /// Adds a node with a custom capacity.
    pub fn add_node_with(&mut self, kind: NodeKind, capacity: f64) -> Result<NodeId, GraphError> {
        if !(capacity.is_finite() && capacity > 0.0) {
            // the id is not consumed on failure
            return Err(GraphError::InvalidCapacityValue(capacity));
        }
        let id = self.ids.next_id()?;
        self.insert(Node::from_kind(id, kind).with_capacity(capacity));
        Ok(id)
    }

    fn insert(&mut self, node: Node) {
        let id = node.id;
        debug!("Adding {} node {}", node.kind, id);
        self.graph.nodes.push(node);
        self.invalidate();

        if let Some(parent) = self.selected {
            self.graph.edges.push(Edge::new(parent, id));
        }
    }

    /// Connects two existing nodes.
    ///
    /// Returns `Ok(false)` if the identical edge already exists.
    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<bool, GraphError> {
        if !self.graph.contains(source) || !self.graph.contains(target) {
            return Err(GraphError::DanglingEdge {
                from: source,
                to: target,
            });
        }

        let edge = Edge::new(source, target);
        if self.graph.edges.contains(&edge) {
            return Ok(false);
        }

        self.graph.edges.push(edge);
        self.invalidate();
        Ok(true)
    }

    /// Selects a node.
    pub fn select(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.graph.contains(id) {
            return Err(GraphError::unknown(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let position = self
            .graph
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(GraphError::UnknownNode(id))?;

        let node = self.graph.nodes.remove(position);
        let before = self.graph.edges.len();
        self.graph.edges.retain(|e| !e.touches(id));
        debug!(
            "Removed node {} and {} incident edges",
            id,
            before - self.graph.edges.len()
        );

        if self.selected == Some(id) {
            self.selected = None;
        }
        self.invalidate();
        Ok(node)
    }

    /// Removes the selected node, if any.
    pub fn remove_selected(&mut self) -> Option<Node> {
        let id = self.selected?;
        self.remove_node(id).ok()
    }

    /// Runs the engine on the current graph and keeps the result.
    pub fn simulate(
        &mut self,
        rps: f64,
        config: &SimulationConfig,
    ) -> Result<&SimulationResult, SimulationError> {
        let result = simulate(&self.graph, rps, config)?;
        Ok(&*self.last_result.insert(result))
    }

    fn invalidate(&mut self) {
        self.last_result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ids_are_monotonic_per_session() {
        let mut a = GraphSession::new();
        let mut b = GraphSession::new();

        assert_eq!(a.add_node(NodeKind::Api).unwrap(), NodeId(1));
        assert_eq!(a.add_node(NodeKind::Database).unwrap(), NodeId(2));
        assert_eq!(b.add_node(NodeKind::Api).unwrap(), NodeId(1));

        let removed = a.remove_node(NodeId(2)).unwrap();
        assert_eq!(removed.kind, NodeKind::Database);
        assert_eq!(a.add_node(NodeKind::Api).unwrap(), NodeId(3));
    }

    #[test]
    fn test_starter_session() {
        let session = GraphSession::starter();
        let node = session.graph().node(NodeId(1)).unwrap();
        assert_eq!(node.kind, NodeKind::Api);
        assert_eq!(node.capacity, 1000.0);
        assert_eq!(node.latency_ms, 20.0);
    }

    #[test]
    fn test_add_connects_from_selection() {
        let mut session = GraphSession::starter();
        session.select(NodeId(1)).unwrap();
        let db = session.add_node(NodeKind::Database).unwrap();

        assert_eq!(session.graph().edges, vec![Edge::between(1, db.0)]);
        assert_eq!(session.graph().node(db).unwrap().capacity, 500.0);

        session.clear_selection();
        session.add_node(NodeKind::Api).unwrap();
        assert_eq!(session.graph().edges.len(), 1);
    }

    #[test]
    fn test_connect_validates_and_dedups() {
        let mut session = GraphSession::new();
        let a = session.add_node(NodeKind::Api).unwrap();
        let b = session.add_node(NodeKind::Database).unwrap();

        assert_eq!(session.connect(a, b), Ok(true));
        assert_eq!(session.connect(a, b), Ok(false));
        assert_eq!(
            session.connect(a, NodeId(9)),
            Err(GraphError::DanglingEdge { from: a, to: NodeId(9) })
        );
        assert_eq!(session.graph().edges.len(), 1);
    }

    #[test]
    fn test_remove_cascades_edges_and_selection() {
        let mut session = GraphSession::new();
        let a = session.add_node(NodeKind::Api).unwrap();
        let b = session.add_node(NodeKind::Api).unwrap();
        let c = session.add_node(NodeKind::Database).unwrap();
        session.connect(a, b).unwrap();
        session.connect(b, c).unwrap();
        session.connect(a, c).unwrap();

        session.select(b).unwrap();
        let removed = session.remove_selected().unwrap();
        assert_eq!(removed.id, b);
        assert_eq!(session.selected(), None);
        assert_eq!(session.graph().edges, vec![Edge::between(a.0, c.0)]);
        assert!(session.graph().validate().is_ok());

        assert_eq!(session.remove_node(b), Err(GraphError::UnknownNode(b)));
        assert!(session.remove_selected().is_none());
    }

    #[test]
    fn test_custom_capacity() {
        let mut session = GraphSession::new();
        assert_eq!(
            session.add_node_with(NodeKind::Api, 0.0),
            Err(GraphError::InvalidCapacityValue(0.0))
        );
        assert!(session.add_node_with(NodeKind::Api, f64::NAN).is_err());
        let id = session.add_node_with(NodeKind::Api, 42.0).unwrap();
        assert_eq!(id, NodeId(1));
        assert_eq!(session.graph().node(id).unwrap().capacity, 42.0);
    }

    #[test]
    fn test_simulate_keeps_result_until_edit() {
        let mut session = GraphSession::starter();
        session.select(NodeId(1)).unwrap();
        let db = session.add_node(NodeKind::Database).unwrap();

        let config = SimulationConfig::default();
        let result = session.simulate(1000.0, &config).unwrap();
        assert_relative_eq!(result.node(db).unwrap().current_load, 1000.0);
        assert!(result.node(db).unwrap().overloaded);
        assert!(session.last_result().is_some());

        session.add_node(NodeKind::Api).unwrap();
        assert!(session.last_result().is_none());
    }

    #[test]
    fn test_from_graph_resumes_ids() {
        let graph = Graph::from_parts(
            vec![Node::from_kind(NodeId(5), NodeKind::Api)],
            vec![],
        );
        let mut session = GraphSession::from_graph(graph).unwrap();
        assert_eq!(session.add_node(NodeKind::Api).unwrap(), NodeId(6));

        let dangling = Graph::from_parts(vec![], vec![Edge::between(1, 2)]);
        assert!(GraphSession::from_graph(dangling).is_err());
    }

    #[test]
    fn test_id_space_never_wraps() {
        let full = Graph::from_parts(
            vec![Node::from_kind(NodeId(u64::MAX), NodeKind::Api)],
            vec![],
        );
        assert_eq!(
            GraphSession::from_graph(full).unwrap_err(),
            GraphError::IdSpaceExhausted(NodeId(u64::MAX))
        );

        let nearly = Graph::from_parts(
            vec![Node::from_kind(NodeId(u64::MAX - 1), NodeKind::Api)],
            vec![],
        );
        let mut session = GraphSession::from_graph(nearly).unwrap();
        assert_eq!(
            session.add_node(NodeKind::Database),
            Err(GraphError::IdSpaceExhausted(NodeId(u64::MAX)))
        );
        assert_eq!(session.graph().len(), 1);
        assert!(session.add_node_with(NodeKind::Api, 10.0).is_err());
        assert_eq!(session.graph().nodes[0].id, NodeId(u64::MAX - 1));
    }
}

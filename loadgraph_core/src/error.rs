//! Error types for the LoadGraph model and engine.

use crate::types::NodeId;
use thiserror::Error;

/// Errors raised by structural edits and graph validation.
///
/// The structural queries in [`Graph`](crate::Graph) never fail; these only
/// surface from session edits and [`Graph::validate`](crate::Graph::validate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Two nodes share the same id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Referenced node does not exist
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Edge endpoint references a missing node
    #[error("Edge {from} -> {to} references a missing node")]
    DanglingEdge { from: NodeId, to: NodeId },

    /// Capacity must be a positive finite number
    #[error("Invalid capacity {capacity} on node {id}")]
    InvalidCapacity { id: NodeId, capacity: f64 },

    /// Capacity rejected before any node was created
    #[error("Invalid capacity {0}")]
    InvalidCapacityValue(f64),

    /// No id above the largest one in use is left
    #[error("Node id space exhausted after {0}")]
    IdSpaceExhausted(NodeId),
}

impl GraphError {
    /// Creates an unknown-node error.
    pub fn unknown(id: impl Into<NodeId>) -> Self {
        Self::UnknownNode(id.into())
    }
}

/// Errors that abort a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Injected rate refused by the configured rate policy
    #[error("Invalid request rate: {0}")]
    InvalidRate(f64),

    /// Budget exhausted on a graph with a cycle.
    ///
    /// `cycle` holds every node that cannot be topologically ordered: the
    /// nodes on a cycle plus everything downstream of one.
    #[error(
        "Delivery budget of {limit} exceeded with {pending} deliveries still queued; {} nodes sit on or behind a cycle",
        .cycle.len()
    )]
    CycleDetected {
        limit: usize,
        pending: usize,
        cycle: Vec<NodeId>,
    },

    /// Budget exhausted on an acyclic graph.
    ///
    /// Deliveries to a node equal the number of entry-to-node paths, which
    /// grows exponentially with the depth of densely connected layers.
    #[error("Delivery budget of {limit} exceeded with {pending} deliveries still queued; the graph is acyclic but has more entry-to-node paths than the budget allows")]
    DeliveryBudgetExceeded { limit: usize, pending: usize },
}

impl SimulationError {
    /// Returns true if the run was aborted by the delivery budget, cyclic or not.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(
            self,
            Self::DeliveryBudgetExceeded { .. } | Self::CycleDetected { .. }
        )
    }

    /// Returns true if the budget tripped on a graph that contains a cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CycleDetected { .. })
    }
}

//! The load propagation engine.
//!
//! One static steady-state pass over a graph snapshot:
//!
//! ```text
//!   entry nodes ──(rps each)──► queue ──► accumulate ──► classify ──► admit
//!                                 ▲                                    │
//!                                 └──── accepted / |children| ◄────────┘
//! ```
//!
//! Every entry node receives the full injected rate. Deliveries drain in
//! FIFO order. Load accumulates per node, overload is judged per delivery,
//! and only `min(amount, capacity)` travels further, split evenly across
//! the node's outgoing edges.

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::graph::Graph;
use crate::types::{Edge, Node, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// One unit of work in the propagation queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// Receiving node
    pub target: NodeId,

    /// Load attributed to the receiver
    pub amount: f64,
}

/// Per-node output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub capacity: f64,
    pub latency_ms: f64,

    /// Sum of every delivery to this node
    pub current_load: f64,

    /// Some single delivery exceeded capacity
    pub overloaded: bool,

    /// Largest single delivery (0 if none arrived)
    pub peak_delivery: f64,

    /// Number of deliveries received
    pub deliveries: usize,
}

impl NodeLoad {
    /// Creates a reset record for a node.
    fn reset(node: &Node) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            label: node.label.clone(),
            capacity: node.capacity,
            latency_ms: node.latency_ms,
            current_load: 0.0,
            overloaded: false,
            peak_delivery: 0.0,
            deliveries: 0,
        }
    }

    /// Records one delivery and returns the amount admitted downstream.
    fn receive(&mut self, amount: f64) -> f64 {
        self.peak_delivery = if self.deliveries == 0 {
            amount
        } else {
            self.peak_delivery.max(amount)
        };
        self.deliveries += 1;
        self.current_load += amount;

        if amount > self.capacity {
            self.overloaded = true;
        }

        amount.min(self.capacity)
    }

    /// Some single delivery exceeded capacity.
    pub fn overloaded_per_delivery(&self) -> bool {
        self.overloaded
    }

    /// Accumulated load exceeds capacity.
    ///
    /// A node fed by several small deliveries can be cumulatively overloaded
    /// without any single delivery tripping `overloaded`.
    pub fn overloaded_cumulative(&self) -> bool {
        self.current_load > self.capacity
    }

    /// Accumulated load as a fraction of capacity.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.current_load / self.capacity
        } else {
            0.0
        }
    }
}

/// Annotated snapshot produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Rate injected at every entry node
    pub rps: f64,

    /// One record per input node, in input order
    pub nodes: Vec<NodeLoad>,

    /// Edges, unchanged
    pub edges: Vec<Edge>,

    /// Total deliveries processed
    pub deliveries: usize,
}

impl SimulationResult {
    /// Returns the record for a node.
    pub fn node(&self, id: NodeId) -> Option<&NodeLoad> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes flagged by the per-delivery test.
    pub fn overloaded(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.overloaded_per_delivery())
            .map(|n| n.id)
            .collect()
    }

    /// Nodes whose accumulated load exceeds capacity.
    pub fn cumulatively_overloaded(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.overloaded_cumulative())
            .map(|n| n.id)
            .collect()
    }

    /// Sum of load over all nodes.
    pub fn total_load(&self) -> f64 {
        self.nodes.iter().map(|n| n.current_load).sum()
    }

    /// Returns true if any node is overloaded per delivery.
    pub fn has_overload(&self) -> bool {
        self.nodes.iter().any(|n| n.overloaded)
    }
}

/// Runs one propagation pass.
///
/// The input graph is only read; the returned result is a fresh value the
/// caller may adopt or discard.
///
/// # Errors
/// * `InvalidRate` - `rps` refused by `config.rate_policy`
/// * `CycleDetected` - more than `config.max_deliveries` deliveries were
///   needed and the graph contains a cycle
/// * `DeliveryBudgetExceeded` - more than `config.max_deliveries` deliveries
///   were needed on an acyclic graph; a node receives one delivery per
///   entry-to-node path, so deep densely connected DAGs can trip it too
pub fn simulate(
    graph: &Graph,
    rps: f64,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    if !config.rate_policy.admits(rps) {
        return Err(SimulationError::InvalidRate(rps));
    }

    // Reset: fresh output arena, indexed by node id (first wins on duplicates)
    let mut loads: Vec<NodeLoad> = graph.nodes.iter().map(NodeLoad::reset).collect();
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(loads.len());
    for (slot, load) in loads.iter().enumerate() {
        index.entry(load.id).or_insert(slot);
    }

    let adjacency = graph.adjacency();
    let entries = graph.entry_nodes();

    debug!(
        "Simulating {} nodes / {} edges, rps={} at {} entry nodes",
        graph.nodes.len(),
        graph.edges.len(),
        rps,
        entries.len()
    );

    // Seed: each entry receives the full rate
    let mut queue: VecDeque<Delivery> = entries
        .into_iter()
        .map(|target| Delivery { target, amount: rps })
        .collect();

    let mut processed = 0usize;

    while let Some(delivery) = queue.pop_front() {
        if processed >= config.max_deliveries {
            let pending = queue.len() + 1;
            let limit = config.max_deliveries;
            return Err(match graph.find_cycle() {
                Some(cycle) => {
                    warn!(
                        "Delivery budget of {} exhausted with {} pending; {} nodes on or behind a cycle",
                        limit,
                        pending,
                        cycle.len()
                    );
                    SimulationError::CycleDetected {
                        limit,
                        pending,
                        cycle,
                    }
                }
                None => {
                    warn!(
                        "Delivery budget of {} exhausted with {} pending on an acyclic graph",
                        limit, pending
                    );
                    SimulationError::DeliveryBudgetExceeded { limit, pending }
                }
            });
        }
        processed += 1;

        let Some(&slot) = index.get(&delivery.target) else {
            debug!("Discarding delivery to unknown node {}", delivery.target);
            continue;
        };

        let accepted = loads[slot].receive(delivery.amount);

        let Some(children) = adjacency.get(&delivery.target) else {
            continue; // sink
        };
        if children.is_empty() {
            continue;
        }

        let per_child = accepted / children.len() as f64;
        queue.extend(children.iter().map(|&target| Delivery {
            target,
            amount: per_child,
        }));
    }

    let result = SimulationResult {
        rps,
        nodes: loads,
        edges: graph.edges.clone(),
        deliveries: processed,
    };

    debug!(
        "Simulation done: {} deliveries, {} overloaded",
        processed,
        result.overloaded().len()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RatePolicy;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn node(id: u64, capacity: f64) -> Node {
        Node::from_kind(NodeId(id), NodeKind::Api).with_capacity(capacity)
    }

    fn run(graph: &Graph, rps: f64) -> SimulationResult {
        simulate(graph, rps, &SimulationConfig::default()).unwrap()
    }

    fn load(result: &SimulationResult, id: u64) -> &NodeLoad {
        result.node(NodeId(id)).unwrap()
    }

    #[test]
    fn test_single_node() {
        let graph = Graph::from_parts(vec![node(1, 100.0)], vec![]);

        let under = run(&graph, 80.0);
        assert_relative_eq!(load(&under, 1).current_load, 80.0);
        assert!(!load(&under, 1).overloaded);

        let over = run(&graph, 120.0);
        assert_relative_eq!(load(&over, 1).current_load, 120.0);
        assert!(load(&over, 1).overloaded);
        assert_eq!(over.deliveries, 1);
    }

    #[test]
    fn test_linear_chain() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 100.0), node(3, 100.0)],
            vec![Edge::between(1, 2), Edge::between(2, 3)],
        );

        let result = run(&graph, 50.0);
        for id in 1..=3 {
            assert_relative_eq!(load(&result, id).current_load, 50.0);
            assert!(!load(&result, id).overloaded);
        }
        assert!(!result.has_overload());
    }

    #[test]
    fn test_fan_out_split() {
        let graph = Graph::from_parts(
            vec![node(1, 1000.0), node(2, 500.0), node(3, 500.0)],
            vec![Edge::between(1, 2), Edge::between(1, 3)],
        );

        let result = run(&graph, 100.0);
        assert_relative_eq!(load(&result, 1).current_load, 100.0);
        assert_relative_eq!(load(&result, 2).current_load, 50.0);
        assert_relative_eq!(load(&result, 3).current_load, 50.0);
    }

    #[test]
    fn test_overload_is_per_delivery_not_total() {
        // 1 -> {2, 3}, both -> 4; 4 gets two deliveries of 8
        let graph = Graph::from_parts(
            vec![node(1, 1000.0), node(2, 1000.0), node(3, 1000.0), node(4, 10.0)],
            vec![Edge::between(1, 2), Edge::between(1, 3), Edge::between(2, 4), Edge::between(3, 4)],
        );

        let result = run(&graph, 16.0);
        let sink = load(&result, 4);
        assert_relative_eq!(sink.current_load, 16.0);
        assert_eq!(sink.deliveries, 2);
        assert_relative_eq!(sink.peak_delivery, 8.0);
        assert!(!sink.overloaded_per_delivery());
        assert!(sink.overloaded_cumulative());
        assert_eq!(result.overloaded(), Vec::<NodeId>::new());
        assert_eq!(result.cumulatively_overloaded(), vec![NodeId(4)]);
    }

    #[test]
    fn test_entries_each_receive_full_rate() {
        let graph = Graph::from_parts(
            vec![node(1, 1000.0), node(2, 1000.0), node(3, 1000.0), node(4, 1000.0)],
            vec![Edge::between(1, 2), Edge::between(3, 4)],
        );

        let result = run(&graph, 300.0);
        for id in 1..=4 {
            assert_relative_eq!(load(&result, id).current_load, 300.0);
        }
    }

    #[test]
    fn test_admission_caps_forwarded_load() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 40.0), node(3, 40.0)],
            vec![Edge::between(1, 2), Edge::between(1, 3)],
        );

        let result = run(&graph, 250.0);
        assert!(load(&result, 1).overloaded);
        assert_relative_eq!(load(&result, 1).current_load, 250.0);
        // only 100 admitted, split in two
        assert_relative_eq!(load(&result, 2).current_load, 50.0);
        assert!(load(&result, 2).overloaded);
        assert_relative_eq!(load(&result, 1).utilization(), 2.5);
    }

    #[test]
    fn test_isolated_node_alongside_chain() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 100.0), node(3, 10.0)],
            vec![Edge::between(1, 2)],
        );

        let result = run(&graph, 20.0);
        let isolated = load(&result, 3);
        assert_relative_eq!(isolated.current_load, 20.0);
        assert!(isolated.overloaded);
        assert_eq!(isolated.deliveries, 1);
        assert_eq!(result.deliveries, 3);
    }

    #[test]
    fn test_rerun_is_identical_and_input_untouched() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 30.0), node(3, 30.0)],
            vec![Edge::between(1, 2), Edge::between(1, 3), Edge::between(2, 3)],
        );
        let before = graph.clone();

        let first = run(&graph, 90.0);
        let second = run(&graph, 90.0);
        assert_eq!(first, second);
        assert_eq!(graph, before);
    }

    #[test]
    fn test_zero_rate() {
        let graph = Graph::from_parts(vec![node(1, 10.0), node(2, 10.0)], vec![Edge::between(1, 2)]);
        let result = run(&graph, 0.0);
        assert_eq!(result.total_load(), 0.0);
        assert!(!result.has_overload());
    }

    #[test]
    fn test_negative_rate_policy() {
        let graph = Graph::from_parts(vec![node(1, 10.0)], vec![]);

        let rejected = simulate(&graph, -5.0, &SimulationConfig::default());
        assert_eq!(rejected, Err(SimulationError::InvalidRate(-5.0)));

        let config = SimulationConfig::default().with_rate_policy(RatePolicy::PassThrough);
        let result = simulate(&graph, -5.0, &config).unwrap();
        assert_relative_eq!(load(&result, 1).current_load, -5.0);
        assert!(!load(&result, 1).overloaded);
        assert_relative_eq!(load(&result, 1).peak_delivery, -5.0);
    }

    #[test]
    fn test_dangling_edge_is_discarded() {
        let graph = Graph::from_parts(vec![node(1, 100.0)], vec![Edge::between(1, 42)]);

        let result = run(&graph, 10.0);
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.deliveries, 2);
        assert_relative_eq!(load(&result, 1).current_load, 10.0);
    }

    #[test]
    fn test_cycle_hits_budget() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 100.0), node(3, 100.0)],
            vec![Edge::between(1, 2), Edge::between(2, 3), Edge::between(3, 2)],
        );

        let config = SimulationConfig::default().with_max_deliveries(50);
        let err = simulate(&graph, 10.0, &config).unwrap_err();
        assert_eq!(
            err,
            SimulationError::CycleDetected {
                limit: 50,
                pending: 1,
                cycle: vec![NodeId(2), NodeId(3)],
            }
        );
        assert!(err.is_budget_exceeded());
        assert!(err.is_cycle());
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_deep_ladder_dag_is_not_reported_as_cycle() {
        // 21 layers of two nodes, each fully connected to the next layer:
        // every node in layer k receives 2^(k-1) deliveries
        let layers = 21u64;
        let nodes: Vec<Node> = (1..=layers * 2).map(|id| node(id, 1000.0)).collect();
        let mut edges = Vec::new();
        for layer in 0..layers - 1 {
            for from in [layer * 2 + 1, layer * 2 + 2] {
                edges.push(Edge::between(from, layer * 2 + 3));
                edges.push(Edge::between(from, layer * 2 + 4));
            }
        }
        let graph = Graph::from_parts(nodes, edges);
        assert!(graph.is_acyclic());

        let err = simulate(&graph, 10.0, &SimulationConfig::default()).unwrap_err();
        assert!(err.is_budget_exceeded());
        assert!(!err.is_cycle());
        assert!(matches!(
            err,
            SimulationError::DeliveryBudgetExceeded { limit: 1_000_000, .. }
        ));
        assert!(err.to_string().contains("acyclic"));
    }

    #[test]
    fn test_budget_is_inclusive() {
        let graph = Graph::from_parts(
            vec![node(1, 100.0), node(2, 100.0)],
            vec![Edge::between(1, 2)],
        );

        let config = SimulationConfig::default().with_max_deliveries(2);
        assert!(simulate(&graph, 10.0, &config).is_ok());

        let config = SimulationConfig::default().with_max_deliveries(1);
        assert!(simulate(&graph, 10.0, &config).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let result = run(&Graph::new(), 100.0);
        assert!(result.nodes.is_empty());
        assert_eq!(result.deliveries, 0);
    }

    proptest! {
        #[test]
        fn prop_chain_forwards_min_of_rate_and_capacities(
            caps in prop::collection::vec(1.0f64..2000.0, 1..12),
            rps in 0.0f64..5000.0,
        ) {
            let nodes: Vec<Node> = caps
                .iter()
                .enumerate()
                .map(|(i, c)| node(i as u64 + 1, *c))
                .collect();
            let edges: Vec<Edge> = (1..caps.len() as u64).map(|i| Edge::between(i, i + 1)).collect();
            let graph = Graph::from_parts(nodes, edges);

            let result = run(&graph, rps);
            let mut expected = rps;
            for (i, cap) in caps.iter().enumerate() {
                let record = load(&result, i as u64 + 1);
                prop_assert!((record.current_load - expected).abs() < 1e-9);
                prop_assert_eq!(record.overloaded, expected > *cap);
                expected = expected.min(*cap);
            }
        }
    }
}

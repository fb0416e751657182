//! Seeded random topology generator.
//!
//! Produces random DAGs: edges only ever point from an earlier
//! node to a later one, so every generated graph is acyclic by construction.
//! The same seed always yields the same graph.

use loadgraph_core::{Edge, Graph, Node, NodeId, NodeKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shape parameters for a generated topology.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Number of components
    pub nodes: usize,

    /// Probability of an edge between an earlier and a later node
    pub edge_probability: f64,

    /// Upper bound on outgoing edges per node
    pub max_fan_out: usize,

    /// Fraction of components that are databases
    pub database_ratio: f64,

    /// Capacities are drawn from `[1 - spread, 1 + spread] * kind default`
    pub capacity_spread: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            nodes: 40,
            edge_probability: 0.08,
            max_fan_out: 4,
            database_ratio: 0.3,
            capacity_spread: 0.5,
        }
    }
}

impl TopologyConfig {
    /// Sets the node count.
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }
}

/// Generates a random acyclic graph from a seed.
pub fn random_dag(seed: u64, config: &TopologyConfig) -> Graph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spread = config.capacity_spread.clamp(0.0, 0.95);

    let nodes: Vec<Node> = (0..config.nodes)
        .map(|i| {
            let kind = if rng.gen_bool(config.database_ratio.clamp(0.0, 1.0)) {
                NodeKind::Database
            } else {
                NodeKind::Api
            };
            let factor = if spread > 0.0 {
                rng.gen_range(1.0 - spread..=1.0 + spread)
            } else {
                1.0
            };
            let defaults = kind.defaults();
            let capacity = (defaults.capacity * factor).round().max(1.0);
            let id = NodeId::new(i as u64 + 1);
            Node::from_kind(id, kind)
                .with_capacity(capacity)
                .with_label(format!("{} {}", defaults.label, id))
        })
        .collect();

    let probability = config.edge_probability.clamp(0.0, 1.0);
    let mut fan_out = vec![0usize; nodes.len()];
    let mut edges = Vec::new();

    for target in 1..nodes.len() {
        for source in 0..target {
            if fan_out[source] >= config.max_fan_out {
                continue;
            }
            if rng.gen_bool(probability) {
                fan_out[source] += 1;
                edges.push(Edge::new(nodes[source].id, nodes[target].id));
            }
        }
    }

    Graph::from_parts(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_same_seed_same_graph() {
        let config = TopologyConfig::default();
        assert_eq!(random_dag(7, &config), random_dag(7, &config));
        assert_ne!(random_dag(7, &config), random_dag(8, &config));
    }

    #[test]
    fn test_empty_and_single() {
        let empty = random_dag(1, &TopologyConfig::default().with_nodes(0));
        assert!(empty.is_empty());

        let single = random_dag(1, &TopologyConfig::default().with_nodes(1));
        assert_eq!(single.len(), 1);
        assert!(single.edges.is_empty());

        let node = &single.nodes[0];
        assert_eq!(node.id, NodeId::new(1));
        assert_eq!(node.label, format!("{} 1", node.kind.defaults().label));
    }

    proptest! {
        #[test]
        fn prop_generated_graphs_are_valid_dags(
            seed in any::<u64>(),
            nodes in 0usize..60,
            edge_probability in 0.0f64..0.5,
            max_fan_out in 1usize..6,
        ) {
            let config = TopologyConfig {
                nodes,
                edge_probability,
                max_fan_out,
                ..Default::default()
            };
            let graph = random_dag(seed, &config);

            prop_assert_eq!(graph.len(), nodes);
            prop_assert!(graph.validate().is_ok());
            prop_assert!(graph.is_acyclic());
            for node in &graph.nodes {
                prop_assert!(graph.outgoing(node.id).len() <= max_fan_out);
            }
        }
    }
}

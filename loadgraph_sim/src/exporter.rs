//! JSON exporter for simulation results.
//!
//! Writes the annotated snapshot in a shape an editor front-end can adopt
//! directly: one record per node plus the unchanged edge list.

use loadgraph_core::{Edge, NodeId, NodeLoad, SimulationResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Where the graph came from (scenario name, file path, "random")
    pub source: String,

    /// Seed used, for generated graphs and scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Rate injected at each entry node
    pub rps: f64,

    /// Deliveries processed
    pub deliveries: usize,

    /// Nodes flagged overloaded per delivery
    pub overloaded: Vec<NodeId>,

    /// Nodes whose accumulated load exceeds capacity
    pub cumulatively_overloaded: Vec<NodeId>,

    /// Per-node annotation
    pub nodes: Vec<NodeLoad>,

    /// Edges, unchanged
    pub edges: Vec<Edge>,
}

impl SimExport {
    /// Creates an export from a finished run.
    pub fn new(source: &str, seed: Option<u64>, result: &SimulationResult) -> Self {
        Self {
            source: source.to_string(),
            seed,
            rps: result.rps,
            deliveries: result.deliveries,
            overloaded: result.overloaded(),
            cumulatively_overloaded: result.cumulatively_overloaded(),
            nodes: result.nodes.clone(),
            edges: result.edges.clone(),
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgraph_core::{simulate, Graph, Node, NodeKind, SimulationConfig};

    fn sample() -> SimulationResult {
        let graph = Graph::from_parts(
            vec![
                Node::from_kind(NodeId(1), NodeKind::Api),
                Node::from_kind(NodeId(2), NodeKind::Database),
            ],
            vec![Edge::between(1, 2)],
        );
        simulate(&graph, 800.0, &SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_export_fields() {
        let export = SimExport::new("fixture", None, &sample());
        assert_eq!(export.overloaded, vec![NodeId(2)]);
        assert_eq!(export.cumulatively_overloaded, vec![NodeId(2)]);
        assert_eq!(export.deliveries, 2);

        let json = export.to_json().unwrap();
        assert!(json.contains("\"source\": \"fixture\""));
        assert!(!json.contains("\"seed\""));
    }

    #[test]
    fn test_write_and_read_back() {
        let path = std::env::temp_dir().join(format!("loadgraph_export_{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let export = SimExport::new("fixture", Some(9), &sample());
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: SimExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.seed, Some(9));
        assert_eq!(back.nodes, export.nodes);
        std::fs::remove_file(&path).unwrap();
    }
}

//! LoadGraph Simulation Harness
//!
//! Drives the propagation engine from outside the editor:
//! - **Scenarios**: fixed topologies with known expected propagation
//! - **Generator**: seeded random DAGs for larger, reproducible runs
//! - **Export / Report**: JSON snapshots and plain-text node cards
//!
//! # Usage
//!
//! ```ignore
//! use loadgraph_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42).with_rps(1000.0);
//! let result = runner.run(ScenarioId::FanOut);
//! assert!(result.passed);
//! ```

mod error;
mod exporter;
mod generator;
pub mod report;
mod runner;
pub mod scenarios;

pub use error::SimError;
pub use exporter::SimExport;
pub use generator::{random_dag, TopologyConfig};
pub use runner::{ScenarioResult, ScenarioRunner};

use loadgraph_core::Graph;
use tracing::warn;

/// Loads and validates a graph file.
///
/// A graph containing a cycle is accepted with a warning; the engine's
/// delivery budget decides whether the run completes.
pub fn load_graph(path: &str) -> Result<Graph, SimError> {
    let text = std::fs::read_to_string(path)?;
    let graph = Graph::from_json(&text)?;
    graph.validate()?;

    if let Some(cycle) = graph.find_cycle() {
        warn!(
            "Graph {} has {} nodes on or behind a cycle: {:?}",
            path,
            cycle.len(),
            cycle.iter().map(|id| id.as_u64()).collect::<Vec<_>>()
        );
    }

    Ok(graph)
}

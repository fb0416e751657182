//! Error types for the simulation harness.

use loadgraph_core::{GraphError, SimulationError};
use thiserror::Error;

/// Errors that can occur while loading, running or exporting a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Graph file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph file is not valid JSON for the model
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Graph violates a structural invariant
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Engine refused or aborted the run
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

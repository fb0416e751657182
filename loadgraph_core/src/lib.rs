//! LoadGraph Core - steady-state load propagation over system-design sketches
//!
//! A graph of components (API servers, databases) joined by request-flow
//! edges is fed an injected request rate. The engine pushes that rate from
//! every entry node through the graph in one breadth-first pass:
//!
//! 1. **Accumulate**: every delivery adds to the receiving node's load
//! 2. **Classify**: a node is overloaded if a single delivery exceeds its capacity
//! 3. **Admit**: at most `capacity` continues downstream, split evenly over children
//!
//! # Usage
//!
//! ```
//! use loadgraph_core::{GraphSession, NodeKind, SimulationConfig};
//!
//! let mut session = GraphSession::starter();
//! let api = session.graph().nodes[0].id;
//! session.select(api).unwrap();
//! let db = session.add_node(NodeKind::Database).unwrap();
//!
//! let result = session.simulate(1000.0, &SimulationConfig::default()).unwrap();
//! assert!(result.node(db).unwrap().overloaded);
//! ```

mod config;
mod engine;
mod error;
mod graph;
mod session;
mod types;

pub use config::{RatePolicy, SimulationConfig};
pub use engine::{simulate, Delivery, NodeLoad, SimulationResult};
pub use error::{GraphError, SimulationError};
pub use graph::Graph;
pub use session::{GraphSession, IdGenerator};
pub use types::{Edge, KindDefaults, Node, NodeId, NodeKind};

//! Common types for the LoadGraph model.

use serde::{Deserialize, Serialize};

/// Unique identifier for a component in the graph.
///
/// Ids are handed out by a session-scoped [`IdGenerator`](crate::IdGenerator)
/// and stay stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Creates a NodeId from a raw number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind-specific construction defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindDefaults {
    /// Display label for a freshly added component
    pub label: &'static str,

    /// Maximum load accepted without being overloaded
    pub capacity: f64,

    /// Informational latency in milliseconds
    pub latency_ms: f64,
}

/// The kind of system component a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Stateless API server
    Api,

    /// Backing database
    Database,
}

/// Defaults per kind, indexed in `NodeKind::all()` order.
const KIND_DEFAULTS: [(NodeKind, KindDefaults); 2] = [
    (
        NodeKind::Api,
        KindDefaults { label: "API Server", capacity: 1000.0, latency_ms: 20.0 },
    ),
    (
        NodeKind::Database,
        KindDefaults { label: "Database", capacity: 500.0, latency_ms: 40.0 },
    ),
];

impl NodeKind {
    /// Returns every known kind.
    pub fn all() -> Vec<NodeKind> {
        KIND_DEFAULTS.iter().map(|(kind, _)| *kind).collect()
    }

    /// Returns the default capacity/latency/label for this kind.
    pub fn defaults(&self) -> KindDefaults {
        KIND_DEFAULTS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, defaults)| *defaults)
            .unwrap_or(KIND_DEFAULTS[0].1)
    }

    /// Returns the kind name as serialized.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Api => "api",
            NodeKind::Database => "database",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" | "api_server" => Ok(NodeKind::Api),
            "database" | "db" => Ok(NodeKind::Database),
            _ => Err(format!(
                "Unknown node kind: {} (expected one of: {})",
                s,
                NodeKind::all()
                    .iter()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// A system component.
///
/// This is the input record only. Simulation output lives in
/// [`NodeLoad`](crate::NodeLoad) so a run never mutates the caller's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,

    /// Component kind
    pub kind: NodeKind,

    /// Display label
    pub label: String,

    /// Maximum load a single delivery may carry without overloading the node
    pub capacity: f64,

    /// Informational only; never read by the engine
    #[serde(default)]
    pub latency_ms: f64,
}

impl Node {
    /// Creates a node with the defaults of its kind.
    pub fn from_kind(id: NodeId, kind: NodeKind) -> Self {
        let defaults = kind.defaults();
        Self {
            id,
            kind,
            label: defaults.label.to_string(),
            capacity: defaults.capacity,
            latency_ms: defaults.latency_ms,
        }
    }

    /// Overrides the capacity.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Overrides the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A directed request-flow relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Creates an edge from raw ids.
    pub fn between(source: u64, target: u64) -> Self {
        Self::new(NodeId(source), NodeId(target))
    }

    /// Returns true if either endpoint is `id`.
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

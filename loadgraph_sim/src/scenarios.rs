//! Built-in propagation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// LG-001: one node, no edges
    SingleNode,

    /// LG-002: A -> B -> C at equal capacity
    LinearChain,

    /// LG-003: one parent split across two children
    FanOut,

    /// LG-004: two sub-capacity deliveries that sum past capacity
    DeliveryOverload,

    /// LG-005: two disjoint entry points, each fed the full rate
    MultiEntry,

    /// LG-006: an edgeless node next to a chain
    IsolatedNode,

    /// LG-007: an overloaded gateway caps what reaches its backends
    Saturation,

    /// LG-008: a reachable cycle is stopped by the delivery budget
    CycleGuard,

    /// LG-009: seeded random DAG, determinism and admission bounds
    RandomDag,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleNode,
            ScenarioId::LinearChain,
            ScenarioId::FanOut,
            ScenarioId::DeliveryOverload,
            ScenarioId::MultiEntry,
            ScenarioId::IsolatedNode,
            ScenarioId::Saturation,
            ScenarioId::CycleGuard,
            ScenarioId::RandomDag,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleNode => "single_node",
            ScenarioId::LinearChain => "linear_chain",
            ScenarioId::FanOut => "fan_out",
            ScenarioId::DeliveryOverload => "delivery_overload",
            ScenarioId::MultiEntry => "multi_entry",
            ScenarioId::IsolatedNode => "isolated_node",
            ScenarioId::Saturation => "saturation",
            ScenarioId::CycleGuard => "cycle_guard",
            ScenarioId::RandomDag => "random_dag",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleNode => "Single API server, load equals the injected rate",
            ScenarioId::LinearChain => "Three-node chain at capacity 100, load forwarded hop by hop",
            ScenarioId::FanOut => "Gateway splits its admitted load evenly over two databases",
            ScenarioId::DeliveryOverload => "Two deliveries of 8 into capacity 10: loaded to 16, not flagged",
            ScenarioId::MultiEntry => "Two independent entry points each receive the full rate",
            ScenarioId::IsolatedNode => "Edgeless node is an entry node and a sink at once",
            ScenarioId::Saturation => "Overloaded gateway forwards only its capacity downstream",
            ScenarioId::CycleGuard => "Cycle reachable from an entry aborts on the delivery budget",
            ScenarioId::RandomDag => "Seeded random DAG: reproducible, no delivery above the rate",
        }
    }

    /// Injected rate the scenario is tuned for.
    pub fn default_rps(&self) -> f64 {
        match self {
            ScenarioId::SingleNode => 1000.0,
            ScenarioId::LinearChain => 50.0,
            ScenarioId::FanOut => 100.0,
            ScenarioId::DeliveryOverload => 16.0,
            ScenarioId::MultiEntry => 300.0,
            ScenarioId::IsolatedNode => 200.0,
            ScenarioId::Saturation => 3000.0,
            ScenarioId::CycleGuard => 100.0,
            ScenarioId::RandomDag => 1000.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_node" | "singlenode" | "lg-001" => Ok(ScenarioId::SingleNode),
            "linear_chain" | "linearchain" | "chain" | "lg-002" => Ok(ScenarioId::LinearChain),
            "fan_out" | "fanout" | "lg-003" => Ok(ScenarioId::FanOut),
            "delivery_overload" | "deliveryoverload" | "lg-004" => Ok(ScenarioId::DeliveryOverload),
            "multi_entry" | "multientry" | "lg-005" => Ok(ScenarioId::MultiEntry),
            "isolated_node" | "isolatednode" | "lg-006" => Ok(ScenarioId::IsolatedNode),
            "saturation" | "lg-007" => Ok(ScenarioId::Saturation),
            "cycle_guard" | "cycleguard" | "cycle" | "lg-008" => Ok(ScenarioId::CycleGuard),
            "random_dag" | "randomdag" | "random" | "lg-009" => Ok(ScenarioId::RandomDag),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("LG-004".parse::<ScenarioId>(), Ok(ScenarioId::DeliveryOverload));
        assert_eq!("cycle".parse::<ScenarioId>(), Ok(ScenarioId::CycleGuard));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}

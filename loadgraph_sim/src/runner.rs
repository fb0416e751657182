//! Scenario runner - builds each scenario's topology, runs the engine and
//! checks the outcome against the expected propagation.

use crate::error::SimError;
use crate::generator::{random_dag, TopologyConfig};
use crate::scenarios::ScenarioId;

use loadgraph_core::{
    simulate, GraphSession, NodeId, NodeKind, SimulationConfig, SimulationResult,
};
use tracing::{debug, info};

const TOLERANCE: f64 = 1e-9;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Rate injected at each entry node
    pub rps: f64,

    /// Whether every expectation held
    pub passed: bool,

    /// Deliveries processed by the engine (0 if the run aborted)
    pub deliveries: usize,

    /// Nodes flagged overloaded per delivery
    pub overloaded_nodes: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Engine output, when the run completed
    pub outcome: Option<SimulationResult>,
}

/// Collected expectation failures for one scenario.
#[derive(Debug, Default)]
struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn that(&mut self, condition: bool, message: impl FnOnce() -> String) {
        if !condition {
            self.failures.push(message());
        }
    }

    fn load(&mut self, result: &SimulationResult, id: NodeId, expected: f64) {
        match result.node(id) {
            Some(node) => self.that(close(node.current_load, expected), || {
                format!("node {} load {} != expected {}", id, node.current_load, expected)
            }),
            None => self.failures.push(format!("node {} missing from result", id)),
        }
    }

    fn overloaded(&mut self, result: &SimulationResult, id: NodeId, expected: bool) {
        match result.node(id) {
            Some(node) => self.that(node.overloaded == expected, || {
                format!("node {} overloaded={} expected {}", id, node.overloaded, expected)
            }),
            None => self.failures.push(format!("node {} missing from result", id)),
        }
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= TOLERANCE * expected.abs().max(1.0)
}

type Outcome = Result<(Option<SimulationResult>, Checks), SimError>;

/// Runs propagation scenarios.
pub struct ScenarioRunner {
    /// Seed for generated topologies
    seed: u64,

    /// Rate override (scenario default when unset)
    rps: Option<f64>,

    /// Engine configuration
    config: SimulationConfig,

    /// Shape of generated topologies
    topology: TopologyConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rps: None,
            config: SimulationConfig::default().with_max_deliveries(100_000),
            topology: TopologyConfig::default(),
        }
    }

    /// Overrides every scenario's injected rate.
    pub fn with_rps(mut self, rps: f64) -> Self {
        self.rps = Some(rps);
        self
    }

    /// Sets the engine configuration.
    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the delivery budget.
    pub fn with_max_deliveries(mut self, max_deliveries: usize) -> Self {
        self.config.max_deliveries = max_deliveries;
        self
    }

    /// Sets the generated topology shape.
    pub fn with_topology(mut self, topology: TopologyConfig) -> Self {
        self.topology = topology;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        let rps = self.rps.unwrap_or_else(|| scenario.default_rps());
        info!(
            "Starting scenario: {} - {} (seed={}, rps={})",
            scenario.name(),
            scenario.description(),
            self.seed,
            rps
        );

        let outcome = match scenario {
            ScenarioId::SingleNode => self.run_single_node(rps),
            ScenarioId::LinearChain => self.run_linear_chain(rps),
            ScenarioId::FanOut => self.run_fan_out(rps),
            ScenarioId::DeliveryOverload => self.run_delivery_overload(rps),
            ScenarioId::MultiEntry => self.run_multi_entry(rps),
            ScenarioId::IsolatedNode => self.run_isolated_node(rps),
            ScenarioId::Saturation => self.run_saturation(rps),
            ScenarioId::CycleGuard => self.run_cycle_guard(rps),
            ScenarioId::RandomDag => self.run_random_dag(rps),
        };

        let (outcome, failure_reason) = match outcome {
            Ok((outcome, checks)) if checks.failures.is_empty() => (outcome, None),
            Ok((outcome, checks)) => (outcome, Some(checks.failures.join("; "))),
            Err(e) => (None, Some(e.to_string())),
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            rps,
            passed: failure_reason.is_none(),
            deliveries: outcome.as_ref().map_or(0, |r| r.deliveries),
            overloaded_nodes: outcome.as_ref().map_or(0, |r| r.overloaded().len()),
            failure_reason,
            outcome,
        }
    }

    /// LG-001: a lone API server sees exactly the injected rate.
    fn run_single_node(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::new();
        let api = session.add_node(NodeKind::Api)?;
        let capacity = NodeKind::Api.defaults().capacity;

        let result = session.simulate(rps, &self.config)?.clone();

        let mut checks = Checks::default();
        checks.load(&result, api, rps);
        checks.overloaded(&result, api, rps > capacity);
        checks.that(result.deliveries == 1, || {
            format!("expected 1 delivery, got {}", result.deliveries)
        });
        Ok((Some(result), checks))
    }

    /// LG-002: A -> B -> C, all capacity 100. Each hop forwards what it admits.
    fn run_linear_chain(&self, rps: f64) -> Outcome {
        let capacity = 100.0;
        let mut session = GraphSession::new();
        let mut chain = Vec::new();

        // each new node is wired from the previously selected one
        for _ in 0..3 {
            let id = session.add_node_with(NodeKind::Api, capacity)?;
            session.select(id)?;
            chain.push(id);
        }

        let result = session.simulate(rps, &self.config)?.clone();

        let mut checks = Checks::default();
        let mut expected = rps;
        for id in &chain {
            checks.load(&result, *id, expected);
            checks.overloaded(&result, *id, expected > capacity);
            expected = expected.min(capacity);
        }
        Ok((Some(result), checks))
    }

    /// LG-003: an API gateway splits its admitted load over two databases.
    fn run_fan_out(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::starter();
        let gateway = session.graph().nodes[0].id;
        session.select(gateway)?;
        let primary = session.add_node(NodeKind::Database)?;
        let replica = session.add_node(NodeKind::Database)?;

        let result = session.simulate(rps, &self.config)?.clone();

        let admitted = rps.min(NodeKind::Api.defaults().capacity);
        let per_child = admitted / 2.0;
        let db_capacity = NodeKind::Database.defaults().capacity;

        let mut checks = Checks::default();
        checks.load(&result, gateway, rps);
        for db in [primary, replica] {
            checks.load(&result, db, per_child);
            checks.overloaded(&result, db, per_child > db_capacity);
        }
        Ok((Some(result), checks))
    }

    /// LG-004: two parents each deliver half the rate into a capacity-10 node.
    fn run_delivery_overload(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::new();
        let root = session.add_node(NodeKind::Api)?;
        let left = session.add_node(NodeKind::Api)?;
        let right = session.add_node(NodeKind::Api)?;
        let sink = session.add_node_with(NodeKind::Api, 10.0)?;
        session.connect(root, left)?;
        session.connect(root, right)?;
        session.connect(left, sink)?;
        session.connect(right, sink)?;

        let result = session.simulate(rps, &self.config)?.clone();

        let per_delivery = rps.min(NodeKind::Api.defaults().capacity) / 2.0;

        let mut checks = Checks::default();
        checks.load(&result, sink, 2.0 * per_delivery);
        checks.overloaded(&result, sink, per_delivery > 10.0);
        if let Some(node) = result.node(sink) {
            checks.that(node.deliveries == 2, || {
                format!("sink received {} deliveries, expected 2", node.deliveries)
            });
            checks.that(node.overloaded_cumulative() == (2.0 * per_delivery > 10.0), || {
                format!("sink cumulative overload mismatch at load {}", node.current_load)
            });
        }
        Ok((Some(result), checks))
    }

    /// LG-005: two disjoint chains, each entry fed the full rate.
    fn run_multi_entry(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::new();
        let a = session.add_node(NodeKind::Api)?;
        let b = session.add_node(NodeKind::Database)?;
        let c = session.add_node(NodeKind::Api)?;
        let d = session.add_node(NodeKind::Database)?;
        session.connect(a, b)?;
        session.connect(c, d)?;

        let entries = session.graph().entry_nodes();
        let result = session.simulate(rps, &self.config)?.clone();

        let forwarded = rps.min(NodeKind::Api.defaults().capacity);

        let mut checks = Checks::default();
        checks.that(entries == vec![a, c], || format!("unexpected entry nodes {:?}", entries));
        checks.load(&result, a, rps);
        checks.load(&result, c, rps);
        checks.load(&result, b, forwarded);
        checks.load(&result, d, forwarded);
        Ok((Some(result), checks))
    }

    /// LG-006: an edgeless database beside an API -> API chain.
    fn run_isolated_node(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::starter();
        let head = session.graph().nodes[0].id;
        session.select(head)?;
        session.add_node(NodeKind::Api)?;
        session.clear_selection();
        let isolated = session.add_node(NodeKind::Database)?;

        let graph = session.graph().clone();
        let result = session.simulate(rps, &self.config)?.clone();

        let mut checks = Checks::default();
        checks.that(graph.entry_nodes().contains(&isolated), || {
            format!("isolated node {} is not an entry node", isolated)
        });
        checks.that(graph.outgoing(isolated).is_empty(), || {
            format!("isolated node {} has children", isolated)
        });
        checks.load(&result, isolated, rps);
        checks.overloaded(&result, isolated, rps > NodeKind::Database.defaults().capacity);
        if let Some(node) = result.node(isolated) {
            checks.that(node.deliveries == 1, || {
                format!("isolated node received {} deliveries", node.deliveries)
            });
        }
        Ok((Some(result), checks))
    }

    /// LG-007: gateway -> two workers -> shared database.
    ///
    /// The gateway only admits its capacity, so the backends see a bounded
    /// share no matter how large the injected rate is.
    fn run_saturation(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::new();
        let gateway = session.add_node(NodeKind::Api)?;
        session.select(gateway)?;
        let first = session.add_node(NodeKind::Api)?;
        let second = session.add_node(NodeKind::Api)?;
        session.clear_selection();
        let db = session.add_node(NodeKind::Database)?;
        session.connect(first, db)?;
        session.connect(second, db)?;

        let result = session.simulate(rps, &self.config)?.clone();

        let api_capacity = NodeKind::Api.defaults().capacity;
        let db_capacity = NodeKind::Database.defaults().capacity;
        let per_worker = rps.min(api_capacity) / 2.0;

        let mut checks = Checks::default();
        checks.load(&result, gateway, rps);
        checks.overloaded(&result, gateway, rps > api_capacity);
        for worker in [first, second] {
            checks.load(&result, worker, per_worker);
            checks.overloaded(&result, worker, false);
        }
        checks.load(&result, db, 2.0 * per_worker);
        checks.overloaded(&result, db, per_worker > db_capacity);

        debug!(
            "saturation: gateway={} worker={} db={}",
            rps,
            per_worker,
            2.0 * per_worker
        );
        Ok((Some(result), checks))
    }

    /// LG-008: A -> B -> C -> B never drains; the budget must stop it.
    fn run_cycle_guard(&self, rps: f64) -> Outcome {
        let mut session = GraphSession::new();
        let a = session.add_node(NodeKind::Api)?;
        let b = session.add_node(NodeKind::Api)?;
        let c = session.add_node(NodeKind::Database)?;
        session.connect(a, b)?;
        session.connect(b, c)?;
        session.connect(c, b)?;

        let mut checks = Checks::default();
        let cycle = session.graph().find_cycle();
        checks.that(cycle == Some(vec![b, c]), || format!("unexpected cycle report {:?}", cycle));

        match session.simulate(rps, &self.config) {
            Err(e) if e.is_cycle() => {
                debug!("cycle_guard stopped as expected: {}", e);
                Ok((None, checks))
            }
            Err(e) => Err(e.into()),
            Ok(result) => {
                checks.that(false, || {
                    format!("cycle drained after {} deliveries", result.deliveries)
                });
                Ok((Some(result.clone()), checks))
            }
        }
    }

    /// LG-009: a generated DAG runs to completion, reproducibly, and no
    /// single delivery ever exceeds the injected rate.
    fn run_random_dag(&self, rps: f64) -> Outcome {
        let graph = random_dag(self.seed, &self.topology);
        debug!(
            "random_dag: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );

        let first = simulate(&graph, rps, &self.config)?;
        let second = simulate(&graph, rps, &self.config)?;

        let mut checks = Checks::default();
        checks.that(graph.is_acyclic(), || "generated graph has a cycle".to_string());
        checks.that(first == second, || "repeated run produced a different result".to_string());

        let ceiling = rps.max(0.0);
        for node in &first.nodes {
            checks.that(node.deliveries == 0 || node.peak_delivery <= ceiling + TOLERANCE, || {
                format!("node {} got a delivery of {} above the rate", node.id, node.peak_delivery)
            });
        }
        for entry in graph.entry_nodes() {
            checks.load(&first, entry, rps);
        }
        Ok((Some(first), checks))
    }
}

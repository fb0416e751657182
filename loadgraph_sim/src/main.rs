//! LoadGraph Simulator CLI
//!
//! Run the built-in propagation scenarios, or simulate a graph file or a
//! generated topology.

use clap::Parser;
use loadgraph_core::{simulate, Graph, RatePolicy, SimulationConfig};
use loadgraph_sim::scenarios::ScenarioId;
use loadgraph_sim::{load_graph, random_dag, report, ScenarioResult, ScenarioRunner, SimError, SimExport, TopologyConfig};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// LoadGraph load propagation simulator
#[derive(Parser, Debug)]
#[command(name = "loadgraph-sim")]
#[command(about = "Propagate an injected request rate through a component graph", long_about = None)]
struct Args {
    /// Seed for generated topologies (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (single_node, linear_chain, fan_out, delivery_overload,
    /// multi_entry, isolated_node, saturation, cycle_guard, random_dag, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to run the scenarios over
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Injected request rate (scenario default when omitted; 1000 for graphs)
    #[arg(short, long)]
    rps: Option<f64>,

    /// Delivery budget before a run is aborted (cycles, or DAGs with too many paths)
    #[arg(long, default_value = "1000000")]
    max_deliveries: usize,

    /// Propagate negative rates instead of rejecting them
    #[arg(long)]
    allow_negative_rate: bool,

    /// Simulate a graph JSON file instead of the scenarios
    #[arg(short, long, conflicts_with = "random")]
    graph: Option<String>,

    /// Simulate a generated DAG with this many nodes
    #[arg(long)]
    random: Option<usize>,

    /// Write the annotated result to a JSON file (graph/random mode)
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

const DEFAULT_GRAPH_RPS: f64 = 1000.0;

impl Args {
    fn config(&self) -> SimulationConfig {
        let policy = if self.allow_negative_rate {
            RatePolicy::PassThrough
        } else {
            RatePolicy::Reject
        };
        SimulationConfig::default()
            .with_max_deliveries(self.max_deliveries)
            .with_rate_policy(policy)
    }
}

/// Simulates one graph and prints/exports the result.
fn run_graph(args: &Args, source: &str, seed: Option<u64>, graph: &Graph) -> Result<(), SimError> {
    let rps = args.rps.unwrap_or(DEFAULT_GRAPH_RPS);
    info!(
        "Simulating {} ({} nodes, {} edges) at rps={}",
        source,
        graph.nodes.len(),
        graph.edges.len(),
        rps
    );

    let result = simulate(graph, rps, &args.config())?;
    let export = SimExport::new(source, seed, &result);

    if args.json {
        println!("{}", export.to_json()?);
    } else {
        print!("{}", report::render(&result));
    }

    if let Some(path) = &args.export {
        export.write_to_file(path)?;
        info!("Exported {} nodes to {}", export.nodes.len(), path);
    }

    if result.has_overload() {
        warn!("{} node(s) overloaded", export.overloaded.len());
    }
    Ok(())
}

fn base_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let seed = base_seed(args.seed);

    // Graph-file or generated-topology mode
    let single = if let Some(path) = &args.graph {
        Some(load_graph(path).and_then(|graph| run_graph(&args, path, None, &graph)))
    } else if let Some(nodes) = args.random {
        let graph = random_dag(seed, &TopologyConfig::default().with_nodes(nodes));
        Some(run_graph(&args, "random", Some(seed), &graph))
    } else {
        None
    };

    if let Some(outcome) = single {
        if let Err(e) = outcome {
            error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    if args.export.is_some() {
        warn!("--export only applies to --graph or --random runs; ignoring");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios:");
            for scenario in ScenarioId::all() {
                eprintln!("  {:<18} {}", scenario.name(), scenario.description());
            }
            eprintln!("  {:<18} every scenario above", "all");
            std::process::exit(1);
        })]
    };

    if !args.json {
        info!("LoadGraph Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let run_seed = seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::new(run_seed).with_config(args.config());
        if let Some(rps) = args.rps {
            runner = runner.with_rps(rps);
        }

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | deliveries={} overloaded={}",
                        scenario.name(),
                        run_seed,
                        result.deliveries,
                        result.overloaded_nodes
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        run_seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "rps": r.rps,
                    "passed": r.passed,
                    "deliveries": r.deliveries,
                    "overloaded_nodes": r.overloaded_nodes,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

//! Plain-text rendering of a simulation result.
//!
//! One card per node, the same fields the editor shows on its component
//! boxes, followed by run totals.

use loadgraph_core::{NodeLoad, SimulationResult};
use std::fmt::Write;

/// Renders a single node card.
pub fn render_card(node: &NodeLoad) -> String {
    let marker = if node.overloaded {
        "  [OVERLOADED]"
    } else if node.overloaded_cumulative() {
        "  [over capacity in total]"
    } else {
        ""
    };

    format!(
        "#{} {} ({}){}\n  Capacity: {}\n  Latency: {}ms\n  Load: {}\n",
        node.id,
        node.label,
        node.kind,
        marker,
        format_amount(node.capacity),
        format_amount(node.latency_ms),
        format_amount(node.current_load),
    )
}

/// Renders every card plus a summary.
pub fn render(result: &SimulationResult) -> String {
    let mut out = String::new();
    for node in &result.nodes {
        out.push_str(&render_card(node));
    }

    let _ = writeln!(
        out,
        "\n{} nodes | rps={} | deliveries={} | total load={} | overloaded={} | over capacity in total={}",
        result.nodes.len(),
        format_amount(result.rps),
        result.deliveries,
        format_amount(result.total_load()),
        result.overloaded().len(),
        result.cumulatively_overloaded().len(),
    );
    out
}

/// Whole numbers print without a fraction, everything else with two places.
fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

//! Run configuration for the propagation engine.

use serde::{Deserialize, Serialize};

/// How the engine treats a negative or non-finite injected rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Refuse the run with `SimulationError::InvalidRate`
    #[default]
    Reject,

    /// Propagate the value as-is (negative load is never flagged overloaded)
    PassThrough,
}

impl RatePolicy {
    /// Returns true if `rps` may be injected under this policy.
    pub fn admits(&self, rps: f64) -> bool {
        match self {
            RatePolicy::Reject => rps.is_finite() && rps >= 0.0,
            RatePolicy::PassThrough => true,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum deliveries processed before the run is aborted
    pub max_deliveries: usize,

    /// Treatment of negative or non-finite rates
    pub rate_policy: RatePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_deliveries: 1_000_000,
            rate_policy: RatePolicy::Reject,
        }
    }
}

impl SimulationConfig {
    /// Sets the delivery budget.
    pub fn with_max_deliveries(mut self, max_deliveries: usize) -> Self {
        self.max_deliveries = max_deliveries;
        self
    }

    /// Sets the rate policy.
    pub fn with_rate_policy(mut self, rate_policy: RatePolicy) -> Self {
        self.rate_policy = rate_policy;
        self
    }
}

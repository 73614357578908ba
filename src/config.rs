// In: src/config.rs

//! The single source of truth for solver configuration.
//!
//! `SolverConfig` is created once at the application boundary (a Python keyword
//! argument, a JSON document, or `Default`) and passed by reference into the
//! integer solver. Every field has a serde default so partial documents load.

use serde::{Deserialize, Serialize};

use crate::error::PuanError;

/// Limits and tolerances for the branch-and-bound integer solver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// Maximum number of branch-and-bound nodes to explore. When the limit is hit
    /// the best incumbent is reported as feasible rather than optimal.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum number of simplex pivots per LP relaxation (per phase).
    #[serde(default = "default_max_simplex_iterations")]
    pub max_simplex_iterations: usize,

    /// A relaxed value closer than this to an integer is treated as integral.
    #[serde(default = "default_integrality_tolerance")]
    pub integrality_tolerance: f64,

    /// Pivot and feasibility tolerance used inside the simplex.
    #[serde(default = "default_feasibility_tolerance")]
    pub feasibility_tolerance: f64,
}

impl SolverConfig {
    /// Loads a configuration from a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PuanError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns a copy with `max_nodes` replaced when an override is given.
    pub fn with_max_nodes(mut self, max_nodes: Option<usize>) -> Self {
        if let Some(max_nodes) = max_nodes {
            self.max_nodes = max_nodes;
        }
        self
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_simplex_iterations: default_max_simplex_iterations(),
            integrality_tolerance: default_integrality_tolerance(),
            feasibility_tolerance: default_feasibility_tolerance(),
        }
    }
}

fn default_max_nodes() -> usize {
    100_000
}

fn default_max_simplex_iterations() -> usize {
    10_000
}

fn default_integrality_tolerance() -> f64 {
    1e-6
}

fn default_feasibility_tolerance() -> f64 {
    1e-9
}

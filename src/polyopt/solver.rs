// In: src/polyopt/solver.rs

//! Integer linear programming by depth-first branch and bound.
//!
//! Every node solves the LP relaxation of the problem under tightened column bounds
//! (see `simplex`). Nodes whose relaxation cannot beat the incumbent are pruned, and
//! otherwise the first fractional column is split into `x ≤ ⌊v⌋` and `x ≥ ⌊v⌋ + 1`.

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::PuanError;
use crate::polyopt::simplex::{self, LpOutcome, LpRow, Relation};
use crate::polyopt::Polyhedron;

/// The outcome of an integer solve. Codes are part of the Python contract.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// No conclusion: a limit was hit before any integer point was found.
    Undefined = 1,
    /// An integer point was found but a limit stopped the proof of optimality.
    Feasible = 2,
    Infeasible = 3,
    Unbounded = 4,
    Optimal = 5,
}

impl SolutionStatus {
    pub fn code(self) -> usize {
        self as usize
    }

    /// Unknown codes map to `Undefined`.
    pub fn from_code(code: usize) -> Self {
        match code {
            2 => SolutionStatus::Feasible,
            3 => SolutionStatus::Infeasible,
            4 => SolutionStatus::Unbounded,
            5 => SolutionStatus::Optimal,
            _ => SolutionStatus::Undefined,
        }
    }

    /// `x` and `z` carry an integer point.
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Feasible | SolutionStatus::Optimal)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegerSolution {
    pub x: Vec<i64>,
    pub z: i64,
    pub status_code: usize,
}

impl IntegerSolution {
    fn without_point(status: SolutionStatus) -> Self {
        Self {
            x: Vec::new(),
            z: 0,
            status_code: status.code(),
        }
    }

    pub fn status(&self) -> SolutionStatus {
        SolutionStatus::from_code(self.status_code)
    }
}

/// Maximise `of · x` subject to `ge_ph`, `eq_ph` (as equalities), the column bounds
/// of `ge_ph`, and integrality of every column.
#[derive(Debug, Clone, Default)]
pub struct IntegerLinearProgram {
    pub ge_ph: Polyhedron,
    pub eq_ph: Polyhedron,
    pub of: Vec<f64>,
}

impl IntegerLinearProgram {
    pub fn solve(&self) -> Result<IntegerSolution, PuanError> {
        self.solve_with(&SolverConfig::default())
    }

    pub fn solve_with(&self, config: &SolverConfig) -> Result<IntegerSolution, PuanError> {
        let eq_ph = if self.eq_ph.is_empty() {
            None
        } else {
            Some(&self.eq_ph)
        };
        solve_ilp(&self.ge_ph, eq_ph, &self.of, config)
    }
}

/// Borrowing entry point shared by `IntegerLinearProgram`, `Polyhedron::solve`, and
/// `Theory::solve`.
pub(crate) fn solve_ilp(
    ge_ph: &Polyhedron,
    eq_ph: Option<&Polyhedron>,
    of: &[f64],
    config: &SolverConfig,
) -> Result<IntegerSolution, PuanError> {
    ge_ph.validate()?;
    let ncols = ge_ph.variables.len();
    if of.len() != ncols {
        return Err(PuanError::DimensionMismatch {
            context: "objective function",
            expected: ncols,
            actual: of.len(),
        });
    }

    let mut rows: Vec<LpRow> = (0..ge_ph.a.nrows)
        .map(|i| LpRow {
            coeffs: ge_ph.a.row(i).to_vec(),
            relation: Relation::Ge,
            rhs: ge_ph.b[i],
        })
        .collect();
    if let Some(eq_ph) = eq_ph {
        eq_ph.validate()?;
        if eq_ph.a.ncols != ncols {
            return Err(PuanError::DimensionMismatch {
                context: "equality constraints",
                expected: ncols,
                actual: eq_ph.a.ncols,
            });
        }
        rows.extend((0..eq_ph.a.nrows).map(|i| LpRow {
            coeffs: eq_ph.a.row(i).to_vec(),
            relation: Relation::Eq,
            rhs: eq_ph.b[i],
        }));
    }

    // Integer columns can have their bounds rounded inwards up front.
    let tol = config.integrality_tolerance;
    let root: Vec<(f64, f64)> = ge_ph
        .variables
        .iter()
        .map(|v| ((v.bounds.0 - tol).ceil(), (v.bounds.1 + tol).floor()))
        .collect();

    let mut stack = vec![root];
    let mut incumbent: Option<(Vec<i64>, f64)> = None;
    let mut explored = 0usize;
    let mut limit_hit = false;

    while let Some(bounds) = stack.pop() {
        if explored >= config.max_nodes {
            limit_hit = true;
            break;
        }
        explored += 1;

        let (x, z) = match simplex::solve_lp(&rows, of, &bounds, config) {
            LpOutcome::Optimal { x, z } => (x, z),
            LpOutcome::Infeasible => continue,
            LpOutcome::Unbounded if explored == 1 => {
                log::debug!("LP relaxation is unbounded at the root");
                return Ok(IntegerSolution::without_point(SolutionStatus::Unbounded));
            }
            LpOutcome::Unbounded => continue,
            LpOutcome::IterationLimit => {
                limit_hit = true;
                continue;
            }
        };

        if let Some((_, best)) = &incumbent {
            if z <= best + tol {
                continue;
            }
        }

        match x.iter().position(|v| (v - v.round()).abs() > tol) {
            None => {
                let point: Vec<i64> = x.iter().map(|v| v.round() as i64).collect();
                let value = of.iter().zip(&point).map(|(c, &v)| c * v as f64).sum();
                incumbent = Some((point, value));
            }
            Some(j) => {
                let split = x[j].floor();
                let mut down = bounds.clone();
                down[j].1 = split;
                let mut up = bounds;
                up[j].0 = split + 1.0;
                stack.push(down);
                stack.push(up);
            }
        }
    }

    if limit_hit {
        log::warn!(
            "Branch and bound stopped early after {} nodes (max_nodes = {})",
            explored,
            config.max_nodes
        );
    }
    log_metric!(
        "event" = "branch_and_bound",
        "nodes" = explored,
        "limit_hit" = limit_hit,
        "found" = incumbent.is_some()
    );

    Ok(match incumbent {
        Some((x, z)) => IntegerSolution {
            x,
            z: z.round() as i64,
            status_code: if limit_hit {
                SolutionStatus::Feasible.code()
            } else {
                SolutionStatus::Optimal.code()
            },
        },
        None if limit_hit => IntegerSolution::without_point(SolutionStatus::Undefined),
        None => IntegerSolution::without_point(SolutionStatus::Infeasible),
    })
}

// In: src/polyopt/simplex.rs

//! A dense two-phase primal simplex for the LP relaxations of the integer solver.
//!
//! The LP is handed over in "natural" form: rows over the original columns, each
//! with a relation and a right-hand side, plus per-column bounds that may be
//! infinite. It is rewritten into standard form (`y ≥ 0`, non-negative right-hand
//! sides) by shifting columns with a finite lower bound, reflecting columns with
//! only a finite upper bound, and splitting free columns. Bland's rule is used for
//! both the entering and the leaving column, so the method cannot cycle.

use crate::config::SolverConfig;

/// Phase one is considered feasible when the artificial sum is above `-PHASE_ONE_SLACK`.
const PHASE_ONE_SLACK: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Ge,
    Le,
    Eq,
}

impl Relation {
    fn flipped(self) -> Self {
        match self {
            Relation::Ge => Relation::Le,
            Relation::Le => Relation::Ge,
            Relation::Eq => Relation::Eq,
        }
    }
}

/// `coeffs · x (relation) rhs`.
#[derive(Debug, Clone)]
pub(crate) struct LpRow {
    pub coeffs: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    Optimal { x: Vec<f64>, z: f64 },
    Infeasible,
    Unbounded,
    IterationLimit,
}

enum Stop {
    Unbounded,
    IterationLimit,
}

/// `x = offset + y[pos] - y[neg]`.
struct ColumnMap {
    offset: f64,
    pos: Option<usize>,
    neg: Option<usize>,
}

struct Tableau {
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    is_basic: Vec<bool>,
    ncols: usize,
    eps: f64,
}

impl Tableau {
    fn rhs(&self, i: usize) -> f64 {
        self.rows[i][self.ncols]
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c];
        for v in self.rows[r].iter_mut() {
            *v /= p;
        }
        self.rows[r][c] = 1.0;
        let pivot_row = self.rows[r].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let factor = row[c];
            if factor != 0.0 {
                for (v, pv) in row.iter_mut().zip(&pivot_row) {
                    *v -= factor * pv;
                }
                row[c] = 0.0;
            }
            let rhs = row.len() - 1;
            if row[rhs].abs() < self.eps {
                row[rhs] = 0.0;
            }
        }
        self.is_basic[self.basis[r]] = false;
        self.basis[r] = c;
        self.is_basic[c] = true;
    }

    fn objective_value(&self, cost: &[f64]) -> f64 {
        self.basis
            .iter()
            .enumerate()
            .map(|(i, &b)| cost[b] * self.rhs(i))
            .sum()
    }

    /// Maximises `cost · columns`, only letting `allowed` columns enter the basis.
    fn optimize(&mut self, cost: &[f64], allowed: &[bool], max_iterations: usize) -> Result<(), Stop> {
        let mut iterations = 0usize;
        loop {
            let entering = (0..self.ncols).find(|&j| {
                if !allowed[j] || self.is_basic[j] {
                    return false;
                }
                let reduced: f64 = cost[j]
                    - self
                        .basis
                        .iter()
                        .enumerate()
                        .map(|(i, &b)| cost[b] * self.rows[i][j])
                        .sum::<f64>();
                reduced > self.eps
            });
            let Some(c) = entering else {
                return Ok(());
            };
            if iterations == max_iterations {
                return Err(Stop::IterationLimit);
            }
            iterations += 1;

            let mut leaving: Option<(usize, f64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][c];
                if a <= self.eps {
                    continue;
                }
                let ratio = self.rhs(i) / a;
                let better = match leaving {
                    None => true,
                    Some((r, best)) => {
                        ratio < best - self.eps
                            || (ratio <= best + self.eps && self.basis[i] < self.basis[r])
                    }
                };
                if better {
                    leaving = Some((i, ratio));
                }
            }
            let Some((r, _)) = leaving else {
                return Err(Stop::Unbounded);
            };
            self.pivot(r, c);
        }
    }
}

/// Maximises `objective · x` subject to `rows` and `bounds`.
pub(crate) fn solve_lp(
    rows: &[LpRow],
    objective: &[f64],
    bounds: &[(f64, f64)],
    config: &SolverConfig,
) -> LpOutcome {
    let eps = config.feasibility_tolerance;

    // --- 1. Map every original column onto non-negative standard-form columns ---
    let mut columns = Vec::with_capacity(bounds.len());
    let mut bound_rows: Vec<(usize, f64)> = Vec::new();
    let mut ny = 0usize;
    for &(lower, upper) in bounds {
        if lower > upper + eps {
            return LpOutcome::Infeasible;
        }
        let map = if lower.is_finite() {
            let pos = ny;
            ny += 1;
            if upper.is_finite() {
                bound_rows.push((pos, upper - lower));
            }
            ColumnMap {
                offset: lower,
                pos: Some(pos),
                neg: None,
            }
        } else if upper.is_finite() {
            let neg = ny;
            ny += 1;
            ColumnMap {
                offset: upper,
                pos: None,
                neg: Some(neg),
            }
        } else {
            ny += 2;
            ColumnMap {
                offset: 0.0,
                pos: Some(ny - 2),
                neg: Some(ny - 1),
            }
        };
        columns.push(map);
    }

    // --- 2. Rewrite rows over y with non-negative right-hand sides ---
    let mut standard: Vec<(Vec<f64>, Relation, f64)> = Vec::with_capacity(rows.len() + bound_rows.len());
    for row in rows {
        let mut coeffs = vec![0.0; ny];
        let mut rhs = row.rhs;
        for (a, map) in row.coeffs.iter().zip(&columns) {
            rhs -= a * map.offset;
            if let Some(pos) = map.pos {
                coeffs[pos] += a;
            }
            if let Some(neg) = map.neg {
                coeffs[neg] -= a;
            }
        }
        standard.push((coeffs, row.relation, rhs));
    }
    for (pos, width) in bound_rows {
        let mut coeffs = vec![0.0; ny];
        coeffs[pos] = 1.0;
        standard.push((coeffs, Relation::Le, width));
    }
    for (coeffs, relation, rhs) in standard.iter_mut() {
        if *rhs < 0.0 {
            coeffs.iter_mut().for_each(|a| *a = -*a);
            *rhs = -*rhs;
            *relation = relation.flipped();
        }
    }

    // --- 3. Build the tableau: y | slacks & surpluses | artificials | rhs ---
    let n_slack = standard.iter().filter(|(_, r, _)| *r != Relation::Eq).count();
    let n_artificial = standard.iter().filter(|(_, r, _)| *r != Relation::Le).count();
    let ncols = ny + n_slack + n_artificial;
    let first_artificial = ny + n_slack;

    let mut tableau = Tableau {
        rows: Vec::with_capacity(standard.len()),
        basis: Vec::with_capacity(standard.len()),
        is_basic: vec![false; ncols],
        ncols,
        eps,
    };
    let mut next_slack = ny;
    let mut next_artificial = first_artificial;
    for (coeffs, relation, rhs) in standard {
        let mut row = coeffs;
        row.resize(ncols + 1, 0.0);
        row[ncols] = rhs;
        let basic = match relation {
            Relation::Le => {
                row[next_slack] = 1.0;
                next_slack += 1;
                next_slack - 1
            }
            Relation::Ge => {
                row[next_slack] = -1.0;
                next_slack += 1;
                row[next_artificial] = 1.0;
                next_artificial += 1;
                next_artificial - 1
            }
            Relation::Eq => {
                row[next_artificial] = 1.0;
                next_artificial += 1;
                next_artificial - 1
            }
        };
        tableau.is_basic[basic] = true;
        tableau.basis.push(basic);
        tableau.rows.push(row);
    }

    // --- 4. Phase one: drive the artificial columns to zero ---
    if n_artificial > 0 {
        let phase_one_cost: Vec<f64> = (0..ncols)
            .map(|j| if j >= first_artificial { -1.0 } else { 0.0 })
            .collect();
        let everything = vec![true; ncols];
        if let Err(Stop::IterationLimit) =
            tableau.optimize(&phase_one_cost, &everything, config.max_simplex_iterations)
        {
            return LpOutcome::IterationLimit;
        }
        if tableau.objective_value(&phase_one_cost) < -PHASE_ONE_SLACK {
            return LpOutcome::Infeasible;
        }
        // Pivot remaining (zero-valued) artificials out where the row allows it.
        for i in 0..tableau.rows.len() {
            if tableau.basis[i] < first_artificial {
                continue;
            }
            let replacement = (0..first_artificial)
                .find(|&j| !tableau.is_basic[j] && tableau.rows[i][j].abs() > eps);
            if let Some(j) = replacement {
                tableau.pivot(i, j);
            }
        }
    }

    // --- 5. Phase two: the real objective over y ---
    let mut cost = vec![0.0; ncols];
    for (c, map) in objective.iter().zip(&columns) {
        if let Some(pos) = map.pos {
            cost[pos] += c;
        }
        if let Some(neg) = map.neg {
            cost[neg] -= c;
        }
    }
    let allowed: Vec<bool> = (0..ncols).map(|j| j < first_artificial).collect();
    match tableau.optimize(&cost, &allowed, config.max_simplex_iterations) {
        Ok(()) => {}
        Err(Stop::Unbounded) => return LpOutcome::Unbounded,
        Err(Stop::IterationLimit) => return LpOutcome::IterationLimit,
    }

    let mut y = vec![0.0; ny];
    for (i, &b) in tableau.basis.iter().enumerate() {
        if b < ny {
            y[b] = tableau.rhs(i);
        }
    }
    let x: Vec<f64> = columns
        .iter()
        .map(|map| {
            map.offset + map.pos.map_or(0.0, |p| y[p]) - map.neg.map_or(0.0, |n| y[n])
        })
        .collect();
    let z = objective.iter().zip(&x).map(|(c, v)| c * v).sum();
    LpOutcome::Optimal { x, z }
}

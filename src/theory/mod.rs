//! Propositional theories over integer variables.
//!
//! A `Theory` is a flat list of `Statement`s. A statement without an expression is a
//! leaf variable; a statement with an `AtLeast` expression is a compound node whose
//! boolean variable implies the expression. Expressions reference other statements
//! by variable id, so a theory is a DAG whose roots are the compound statements no
//! other statement refers to.
//!
//! Theories compile to linear inequalities (`to_lineqs`), to a polyhedron
//! (`to_ge_polyhedron`), and can be optimised directly (`solve`).

mod compiler;

use hashbrown::{HashMap as FastMap, HashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SolverConfig;
use crate::error::PuanError;
use crate::lineq::GeLineq;
use crate::polyopt::solver::{self, IntegerSolution, SolutionStatus};
use crate::polyopt::Polyhedron;
use crate::types::Variable;

use compiler::Compiler;

//==================================================================================
// 1. Propositions
//==================================================================================

/// The sign applied to every id of an `AtLeast`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    #[default]
    Positive,
    Negative,
}

impl Sign {
    pub fn factor(self) -> i64 {
        match self {
            Sign::Positive => 1,
            Sign::Negative => -1,
        }
    }
}

/// The proposition `sign·Σ x[ids] + bias ≥ 0`.
///
/// With a positive sign, `bias = -k` reads "at least k of ids". With a negative
/// sign, `bias = k` reads "at most k of ids".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AtLeast {
    pub ids: Vec<u32>,
    pub bias: i64,
    #[serde(default)]
    pub sign: Sign,
}

impl AtLeast {
    pub fn new(ids: Vec<u32>, bias: i64) -> Self {
        Self {
            ids,
            bias,
            sign: Sign::Positive,
        }
    }

    pub fn with_sign(ids: Vec<u32>, bias: i64, sign: Sign) -> Self {
        Self { ids, bias, sign }
    }

    /// "At least one of ids".
    pub fn is_disjunction(&self) -> bool {
        self.sign == Sign::Positive && !self.ids.is_empty() && self.bias == -1
    }

    /// "All of ids".
    pub fn is_conjunction(&self) -> bool {
        self.sign == Sign::Positive
            && !self.ids.is_empty()
            && self.bias == -(self.ids.len() as i64)
    }

    /// Converts the proposition into a `GeLineq`, taking bounds from `variables`.
    pub fn to_lineq(&self, variables: &HashMap<u32, Variable>) -> Result<GeLineq, PuanError> {
        let mut bounds = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            let variable = variables.get(id).ok_or(PuanError::UnknownVariable(*id))?;
            bounds.push(variable.bounds);
        }
        Ok(GeLineq {
            id: None,
            bias: self.bias,
            bounds,
            coeffs: vec![self.sign.factor(); self.ids.len()],
            indices: self.ids.clone(),
        })
    }

    /// Truth value under `values`. `None` if an id has no value.
    pub fn evaluate(&self, values: &HashMap<u32, i64>) -> Option<bool> {
        let mut total: i128 = 0;
        for id in &self.ids {
            total = total.checked_add(i128::from(*values.get(id)?))?;
        }
        let lhs = total
            .checked_mul(i128::from(self.sign.factor()))?
            .checked_add(i128::from(self.bias))?;
        Some(lhs >= 0)
    }
}

/// A node of a theory. `variable` implies `expression` when one is given.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub variable: Variable,
    #[serde(default)]
    pub expression: Option<AtLeast>,
}

impl Statement {
    pub fn leaf(variable: Variable) -> Self {
        Self {
            variable,
            expression: None,
        }
    }

    pub fn compound(variable: Variable, expression: AtLeast) -> Self {
        Self {
            variable,
            expression: Some(expression),
        }
    }
}

//==================================================================================
// 2. Theory
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Theory {
    #[serde(default)]
    pub id: String,
    pub statements: Vec<Statement>,
}

impl Theory {
    pub fn new(id: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            id: id.into(),
            statements,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PuanError> {
        let theory: Theory = serde_json::from_str(json)?;
        theory.validate()?;
        Ok(theory)
    }

    pub fn to_json(&self) -> Result<String, PuanError> {
        Ok(serde_json::to_string(self)?)
    }

    /// All statement variables, in statement order.
    pub fn variables(&self) -> Vec<Variable> {
        self.statements.iter().map(|s| s.variable).collect()
    }

    pub(crate) fn variable_map(&self) -> HashMap<u32, Variable> {
        self.statements
            .iter()
            .map(|s| (s.variable.id, s.variable))
            .collect()
    }

    /// Compound statements that no other statement refers to, in statement order.
    pub fn roots(&self) -> Vec<u32> {
        let referenced: HashSet<u32> = self
            .statements
            .iter()
            .filter_map(|s| s.expression.as_ref())
            .flat_map(|e| e.ids.iter().copied())
            .collect();
        self.statements
            .iter()
            .filter(|s| s.expression.is_some() && !referenced.contains(&s.variable.id))
            .map(|s| s.variable.id)
            .collect()
    }

    /// Checks bounds, id uniqueness, references, and acyclicity.
    pub fn validate(&self) -> Result<(), PuanError> {
        let mut children: FastMap<u32, &[u32]> = FastMap::new();
        for statement in &self.statements {
            statement.variable.validate()?;
            let id = statement.variable.id;
            let ids: &[u32] = statement
                .expression
                .as_ref()
                .map(|e| e.ids.as_slice())
                .unwrap_or(&[]);
            if children.insert(id, ids).is_some() {
                return Err(PuanError::DuplicateVariable(id));
            }
            if statement.expression.is_some() && !statement.variable.is_boolean() {
                return Err(PuanError::NonBooleanCompound(id));
            }
        }
        for ids in children.values() {
            if let Some(unknown) = ids.iter().find(|id| !children.contains_key(*id)) {
                return Err(PuanError::UnknownVariable(*unknown));
            }
        }

        // Iterative DFS with white/grey/black colouring.
        let mut state: FastMap<u32, u8> = FastMap::new();
        for statement in &self.statements {
            let start = statement.variable.id;
            if state.contains_key(&start) {
                continue;
            }
            let mut stack: Vec<(u32, usize)> = vec![(start, 0)];
            state.insert(start, 1);
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let node_children = children[&node];
                if top.1 < node_children.len() {
                    let child = node_children[top.1];
                    top.1 += 1;
                    match state.get(&child) {
                        Some(1) => return Err(PuanError::CyclicTheory(child)),
                        Some(_) => {}
                        None => {
                            state.insert(child, 1);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    state.insert(node, 2);
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    /// Compiles the theory into linear inequalities.
    ///
    /// Every compound statement yields `variable → expression` (id = the statement
    /// id). With `reduced`, nested disjunctions/conjunctions are folded into their
    /// parents where possible and the absorbed statements disappear. With `active`,
    /// `x_root ≥ 1` is appended for every root.
    pub fn to_lineqs(&self, active: bool, reduced: bool) -> Result<Vec<GeLineq>, PuanError> {
        Ok(Compiler::new(self)?.compile(active, reduced)?.lineqs)
    }

    /// Compiles the theory into `A·x ≥ b`. Columns are the theory variables that
    /// survive reduction, in statement order.
    pub fn to_ge_polyhedron(&self, active: bool, reduced: bool) -> Result<Polyhedron, PuanError> {
        Compiler::new(self)?.compile(active, reduced)?.into_polyhedron()
    }

    /// Maximises each objective over the active theory.
    ///
    /// Objectives map variable ids to weights; unknown ids are ignored. Solutions
    /// report `x` over all theory variables in statement order. Variables absorbed
    /// by reduction take the truth value of their own expression, and weights on
    /// them only enter `z`, not the search.
    pub fn solve(
        &self,
        objectives: Vec<HashMap<u32, f64>>,
        reduce_polyhedron: bool,
    ) -> Result<Vec<IntegerSolution>, PuanError> {
        self.solve_with(objectives, reduce_polyhedron, &SolverConfig::default())
    }

    pub fn solve_with(
        &self,
        objectives: Vec<HashMap<u32, f64>>,
        reduce_polyhedron: bool,
        config: &SolverConfig,
    ) -> Result<Vec<IntegerSolution>, PuanError> {
        let compiled = Compiler::new(self)?.compile(true, reduce_polyhedron)?;
        let eliminated = compiled.eliminated.clone();
        let polyhedron = compiled.into_polyhedron()?;
        let variables = self.variables();
        let statements: FastMap<u32, &Statement> = self
            .statements
            .iter()
            .map(|s| (s.variable.id, s))
            .collect();

        objectives
            .iter()
            .map(|objective| -> Result<IntegerSolution, PuanError> {
                let of = polyhedron.objective_vector(objective);
                let reduced_solution = solver::solve_ilp(&polyhedron, None, &of, config)?;
                let status = SolutionStatus::from_code(reduced_solution.status_code);
                if !status.has_solution() {
                    return Ok(reduced_solution);
                }

                let mut values: HashMap<u32, i64> = polyhedron
                    .variables
                    .iter()
                    .zip(&reduced_solution.x)
                    .map(|(v, &x)| (v.id, x))
                    .collect();
                for id in &eliminated {
                    let truth = statements
                        .get(id)
                        .and_then(|s| s.expression.as_ref())
                        .and_then(|e| e.evaluate(&values))
                        .ok_or(PuanError::UnknownVariable(*id))?;
                    values.insert(*id, i64::from(truth));
                }

                let x: Vec<i64> = variables
                    .iter()
                    .map(|v| values.get(&v.id).copied().unwrap_or(0))
                    .collect();
                let z: f64 = variables
                    .iter()
                    .zip(&x)
                    .map(|(v, &value)| objective.get(&v.id).copied().unwrap_or(0.0) * value as f64)
                    .sum();
                Ok(IntegerSolution {
                    x,
                    z: z.round() as i64,
                    status_code: reduced_solution.status_code,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;

// In: src/theory/compiler.rs

//! Compilation of a validated `Theory` into linear inequalities.
//!
//! Compilation runs in two passes. The first computes an expression inequality for
//! every compound statement, folding absorbable children into their parents when
//! reduction is requested. Only after that pass is it known which statements were
//! absorbed, so the second pass emits implications for the survivors.

use hashbrown::{HashMap as FastMap, HashSet};
use std::collections::HashMap;

use crate::error::PuanError;
use crate::linalg::Matrix;
use crate::lineq::GeLineq;
use crate::polyopt::Polyhedron;
use crate::types::{Variable, VariableFloat};

use super::{Statement, Theory};

/// The result of compiling a theory.
pub(crate) struct CompiledTheory {
    pub lineqs: Vec<GeLineq>,
    /// Columns of the resulting polyhedron, in statement order.
    pub columns: Vec<Variable>,
    /// Absorbed statements, children before parents.
    pub eliminated: Vec<u32>,
}

pub(crate) struct Compiler<'a> {
    theory: &'a Theory,
    variables: HashMap<u32, Variable>,
    statements: FastMap<u32, &'a Statement>,
    /// How many times each id occurs across all expressions.
    occurrences: FastMap<u32, usize>,
    expressions: FastMap<u32, GeLineq>,
    eliminated: Vec<u32>,
    eliminated_set: HashSet<u32>,
}

impl<'a> Compiler<'a> {
    pub fn new(theory: &'a Theory) -> Result<Self, PuanError> {
        theory.validate()?;
        let mut occurrences: FastMap<u32, usize> = FastMap::new();
        for expression in theory.statements.iter().filter_map(|s| s.expression.as_ref()) {
            for id in &expression.ids {
                *occurrences.entry(*id).or_insert(0) += 1;
            }
        }
        Ok(Self {
            theory,
            variables: theory.variable_map(),
            statements: theory
                .statements
                .iter()
                .map(|s| (s.variable.id, s))
                .collect(),
            occurrences,
            expressions: FastMap::new(),
            eliminated: Vec::new(),
            eliminated_set: HashSet::new(),
        })
    }

    pub fn compile(mut self, active: bool, reduced: bool) -> Result<CompiledTheory, PuanError> {
        let compounds: Vec<u32> = self
            .theory
            .statements
            .iter()
            .filter(|s| s.expression.is_some())
            .map(|s| s.variable.id)
            .collect();

        for id in &compounds {
            self.expression_for(*id, reduced)?;
        }

        let mut lineqs = Vec::with_capacity(compounds.len());
        for id in &compounds {
            if self.eliminated_set.contains(id) {
                continue;
            }
            let expression = &self.expressions[id];
            let mut implication = GeLineq::implication(&self.variables[id], expression)?;
            implication.id = Some(*id);
            lineqs.push(implication);
        }

        if active {
            for root in self.theory.roots() {
                lineqs.push(GeLineq::literal(&self.variables[&root]));
            }
        }

        let columns: Vec<Variable> = self
            .theory
            .statements
            .iter()
            .map(|s| s.variable)
            .filter(|v| !self.eliminated_set.contains(&v.id))
            .collect();

        if reduced {
            log::debug!(
                "Theory '{}' reduced: {} of {} compound statements absorbed",
                self.theory.id,
                self.eliminated.len(),
                compounds.len()
            );
            log_metric!(
                "event" = "theory_reduction",
                "theory" = &self.theory.id,
                "absorbed" = self.eliminated.len(),
                "rows" = lineqs.len()
            );
        }

        Ok(CompiledTheory {
            lineqs,
            columns,
            eliminated: self.eliminated,
        })
    }

    /// A compound child can be folded into its parent when it is referenced exactly
    /// once across the theory.
    fn is_absorbable(&self, id: u32) -> bool {
        let is_compound = self
            .statements
            .get(&id)
            .map_or(false, |s| s.expression.is_some());
        is_compound && self.occurrences.get(&id).copied() == Some(1)
    }

    fn expression_for(&mut self, id: u32, reduced: bool) -> Result<GeLineq, PuanError> {
        if let Some(known) = self.expressions.get(&id) {
            return Ok(known.clone());
        }
        let statement = self.statements[&id];
        let at_least = statement
            .expression
            .as_ref()
            .ok_or(PuanError::UnknownVariable(id))?;
        let mut expression = at_least.to_lineq(&self.variables)?;

        // `Σx - 1 >= 0` and `Σx - n >= 0` only read as OR/AND over 0/1 children.
        let disjunction = at_least.is_disjunction();
        let foldable = reduced
            && (disjunction || at_least.is_conjunction())
            && at_least.ids.iter().all(|child| self.variables[child].is_boolean());

        if foldable {
            let mut parts = Vec::with_capacity(at_least.ids.len());
            let mut absorbed = Vec::new();
            for child in &at_least.ids {
                if self.is_absorbable(*child) {
                    parts.push(self.expression_for(*child, reduced)?);
                    absorbed.push(*child);
                } else {
                    parts.push(GeLineq::literal(&self.variables[child]));
                }
            }

            if !absorbed.is_empty() {
                let merge = if disjunction {
                    GeLineq::merge_disj
                } else {
                    GeLineq::merge_conj
                };
                let folded = parts
                    .split_first()
                    .and_then(|(first, rest)| {
                        rest.iter()
                            .try_fold(first.clone(), |acc, part| merge(&acc, part))
                    });
                match folded {
                    Some(folded) => {
                        for child in absorbed {
                            if self.eliminated_set.insert(child) {
                                self.eliminated.push(child);
                            }
                        }
                        expression = folded;
                    }
                    None => {
                        log::debug!(
                            "Statement {} keeps its children: no single inequality covers the fold",
                            id
                        );
                    }
                }
            }
        }

        self.expressions.insert(id, expression.clone());
        Ok(expression)
    }
}

impl CompiledTheory {
    /// Lays the inequalities out as `A·x ≥ b` over `columns`.
    pub fn into_polyhedron(self) -> Result<Polyhedron, PuanError> {
        let column_of: FastMap<u32, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, v)| (v.id, col))
            .collect();

        let mut a = Matrix::zeros(self.lineqs.len(), self.columns.len());
        let mut b = Vec::with_capacity(self.lineqs.len());
        let mut index = Vec::with_capacity(self.lineqs.len());
        for (row, lineq) in self.lineqs.iter().enumerate() {
            for (&c, idx) in lineq.coeffs.iter().zip(&lineq.indices) {
                let col = *column_of.get(idx).ok_or(PuanError::UnknownVariable(*idx))?;
                a.set(row, col, a.get(row, col) + c as f64);
            }
            b.push(-lineq.bias as f64);
            index.push(lineq.id);
        }

        let variables: Vec<VariableFloat> =
            self.columns.into_iter().map(VariableFloat::from).collect();
        Polyhedron::new(a, b, variables, index)
    }
}

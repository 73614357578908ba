//! Linear inequalities on the form `Σ coeffs[k]·x[indices[k]] + bias ≥ 0`.
//!
//! A `GeLineq` knows the bounds of every variable it mentions, which is what makes
//! the logical operations below possible: from the bounds we get the range of the
//! left-hand side, and from that range we can tell whether two inequalities can be
//! folded into one that is equivalent to their disjunction or conjunction.

use hashbrown::HashMap as IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PuanError;
use crate::types::Variable;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeLineq {
    /// Id of the statement this inequality was produced from, if any.
    pub id: Option<u32>,
    pub bias: i64,
    pub bounds: Vec<(i64, i64)>,
    pub coeffs: Vec<i64>,
    pub indices: Vec<u32>,
}

impl GeLineq {
    pub fn new(
        id: Option<u32>,
        bias: i64,
        bounds: Vec<(i64, i64)>,
        coeffs: Vec<i64>,
        indices: Vec<u32>,
    ) -> Result<Self, PuanError> {
        if coeffs.len() != indices.len() {
            return Err(PuanError::DimensionMismatch {
                context: "lineq coefficients",
                expected: indices.len(),
                actual: coeffs.len(),
            });
        }
        if bounds.len() != indices.len() {
            return Err(PuanError::DimensionMismatch {
                context: "lineq bounds",
                expected: indices.len(),
                actual: bounds.len(),
            });
        }
        Ok(Self {
            id,
            bias,
            bounds,
            coeffs,
            indices,
        })
    }

    /// `x - 1 >= 0`, i.e. "the variable is set".
    pub fn literal(variable: &Variable) -> Self {
        Self {
            id: None,
            bias: -1,
            bounds: vec![variable.bounds],
            coeffs: vec![1],
            indices: vec![variable.id],
        }
    }

    /// Smallest value of `Σ coeffs·x` over the bounds box (bias excluded).
    /// `None` if it does not fit in an `i64`.
    pub fn eq_min(&self) -> Option<i64> {
        self.range()
            .and_then(|(low, _)| i64::try_from(low).ok())
    }

    /// Largest value of `Σ coeffs·x` over the bounds box (bias excluded).
    /// `None` if it does not fit in an `i64`.
    pub fn eq_max(&self) -> Option<i64> {
        self.range()
            .and_then(|(_, high)| i64::try_from(high).ok())
    }

    /// Satisfied by every point of the bounds box.
    pub fn is_tautology(&self) -> bool {
        self.min_slack().is_some_and(|slack| slack >= 0)
    }

    /// Satisfied by no point of the bounds box.
    pub fn is_contradiction(&self) -> bool {
        self.max_slack().is_some_and(|slack| slack < 0)
    }

    /// The complement over integers: `-Σ coeffs·x - bias - 1 >= 0`.
    /// `None` if a coefficient or the bias has no negation in `i64`.
    pub fn negated(&self) -> Option<Self> {
        let coeffs = self
            .coeffs
            .iter()
            .map(|c| c.checked_neg())
            .collect::<Option<Vec<i64>>>()?;
        Some(Self {
            id: self.id,
            bias: self.bias.checked_neg()?.checked_sub(1)?,
            bounds: self.bounds.clone(),
            coeffs,
            indices: self.indices.clone(),
        })
    }

    /// Value of the left-hand side including the bias. `None` if a variable is
    /// missing or the value does not fit in an `i64`.
    pub fn evaluate<F>(&self, value_of: F) -> Option<i64>
    where
        F: Fn(u32) -> Option<i64>,
    {
        self.evaluate_wide(value_of)
            .and_then(|lhs| i64::try_from(lhs).ok())
    }

    pub fn satisfied_by(&self, values: &HashMap<u32, i64>) -> Option<bool> {
        self.evaluate_wide(|id| values.get(&id).copied())
            .map(|lhs| lhs >= 0)
    }

    // Products of two i64 always fit in an i128; only the sums are checked.
    fn evaluate_wide<F>(&self, value_of: F) -> Option<i128>
    where
        F: Fn(u32) -> Option<i64>,
    {
        let mut total = i128::from(self.bias);
        for (&c, &idx) in self.coeffs.iter().zip(&self.indices) {
            total = total.checked_add(i128::from(c) * i128::from(value_of(idx)?))?;
        }
        Some(total)
    }

    fn range(&self) -> Option<(i128, i128)> {
        let mut low: i128 = 0;
        let mut high: i128 = 0;
        for (&c, &(lo, hi)) in self.coeffs.iter().zip(&self.bounds) {
            let at_lo = i128::from(c) * i128::from(lo);
            let at_hi = i128::from(c) * i128::from(hi);
            low = low.checked_add(at_lo.min(at_hi))?;
            high = high.checked_add(at_lo.max(at_hi))?;
        }
        Some((low, high))
    }

    /// `eq_min + bias`.
    fn min_slack(&self) -> Option<i128> {
        self.range()?.0.checked_add(i128::from(self.bias))
    }

    /// `eq_max + bias`.
    fn max_slack(&self) -> Option<i128> {
        self.range()?.1.checked_add(i128::from(self.bias))
    }

    /// Folds `a` and `b` into one inequality equivalent to `a ∨ b`.
    ///
    /// Works when one side can only be violated by exactly one unit
    /// (`eq_min + bias == -1`): with `K = -(eq_min(other) + bias(other))`,
    /// `K·unit + other + K >= 0` holds iff `unit` holds or `other` holds.
    pub fn merge_disj(a: &GeLineq, b: &GeLineq) -> Option<GeLineq> {
        if a.is_tautology() || b.is_contradiction() {
            return Some(a.detached());
        }
        if b.is_tautology() || a.is_contradiction() {
            return Some(b.detached());
        }
        if a.min_slack() == Some(-1) {
            return Self::disj_with_unit(a, b);
        }
        if b.min_slack() == Some(-1) {
            return Self::disj_with_unit(b, a);
        }
        None
    }

    /// Folds `a` and `b` into one inequality equivalent to `a ∧ b`.
    ///
    /// Works when one side is satisfied only at its maximum (`eq_max + bias == 0`):
    /// with `K = max(eq_max(other) + bias(other), 0) + 1`, `K·tight + other >= 0`
    /// holds iff both hold. `None` as well when a coefficient would leave `i64`.
    pub fn merge_conj(a: &GeLineq, b: &GeLineq) -> Option<GeLineq> {
        if a.is_tautology() {
            return Some(b.detached());
        }
        if b.is_tautology() {
            return Some(a.detached());
        }
        if a.max_slack() == Some(0) {
            return Self::conj_with_tight(a, b);
        }
        if b.max_slack() == Some(0) {
            return Self::conj_with_tight(b, a);
        }
        None
    }

    /// `variable → expression` for a boolean variable, as the disjunction of the
    /// negated literal (which is violated by exactly one unit) and the expression.
    pub fn implication(variable: &Variable, expression: &GeLineq) -> Result<GeLineq, PuanError> {
        if !variable.is_boolean() {
            return Err(PuanError::NonBooleanCompound(variable.id));
        }
        GeLineq::literal(variable)
            .negated()
            .and_then(|not_variable| Self::disj_with_unit(&not_variable, expression))
            .ok_or(PuanError::ArithmeticOverflow("implication"))
    }

    fn disj_with_unit(unit: &GeLineq, other: &GeLineq) -> Option<GeLineq> {
        let k = i64::try_from(other.min_slack()?.checked_neg()?.max(0)).ok()?;
        let bias = k
            .checked_mul(unit.bias)?
            .checked_add(other.bias)?
            .checked_add(k)?;
        Self::combine(&[(unit, k), (other, 1)], bias)
    }

    fn conj_with_tight(tight: &GeLineq, other: &GeLineq) -> Option<GeLineq> {
        let k = i64::try_from(other.max_slack()?.max(0).checked_add(1)?).ok()?;
        let bias = k.checked_mul(tight.bias)?.checked_add(other.bias)?;
        Self::combine(&[(tight, k), (other, 1)], bias)
    }

    /// `Σ k·terms + bias`, merging shared indices and dropping zero coefficients.
    fn combine(terms: &[(&GeLineq, i64)], bias: i64) -> Option<GeLineq> {
        let mut position: IndexMap<u32, usize> = IndexMap::new();
        let mut indices = Vec::new();
        let mut coeffs: Vec<i64> = Vec::new();
        let mut bounds = Vec::new();
        for &(lineq, k) in terms {
            for ((&idx, &c), &bound) in lineq.indices.iter().zip(&lineq.coeffs).zip(&lineq.bounds) {
                let scaled = c.checked_mul(k)?;
                match position.get(&idx) {
                    Some(&pos) => coeffs[pos] = coeffs[pos].checked_add(scaled)?,
                    None => {
                        position.insert(idx, indices.len());
                        indices.push(idx);
                        coeffs.push(scaled);
                        bounds.push(bound);
                    }
                }
            }
        }
        let mut merged = GeLineq {
            id: None,
            bias,
            bounds: Vec::with_capacity(indices.len()),
            coeffs: Vec::with_capacity(indices.len()),
            indices: Vec::with_capacity(indices.len()),
        };
        for ((idx, c), bound) in indices.into_iter().zip(coeffs).zip(bounds) {
            if c != 0 {
                merged.indices.push(idx);
                merged.coeffs.push(c);
                merged.bounds.push(bound);
            }
        }
        Some(merged)
    }

    fn detached(&self) -> GeLineq {
        GeLineq {
            id: None,
            ..self.clone()
        }
    }
}

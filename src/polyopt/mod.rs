//! Polyhedra on the form `A·x ≥ b` and integer optimisation over them.
//!
//! `Polyhedron` is the exchange format between the logic layer and the solver: a
//! theory compiles into one, and the Python layer can also build one directly.

mod simplex;
pub mod solver;

use std::collections::HashMap;

use crate::config::SolverConfig;
use crate::error::PuanError;
use crate::linalg::Matrix;
use crate::types::VariableFloat;

use solver::IntegerSolution;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyhedron {
    /// The left-hand side of linear constraints on the form `a + b + c ≥ x`.
    pub a: Matrix,
    /// The right-hand side of linear constraints as described above.
    pub b: Vec<f64>,
    /// Variables given by `a`, one per column.
    pub variables: Vec<VariableFloat>,
    /// Id on each row.
    pub index: Vec<Option<u32>>,
}

impl Polyhedron {
    /// Creates a polyhedron after checking that every dimension lines up.
    pub fn new(
        a: Matrix,
        b: Vec<f64>,
        variables: Vec<VariableFloat>,
        index: Vec<Option<u32>>,
    ) -> Result<Self, PuanError> {
        let polyhedron = Self {
            a,
            b,
            variables,
            index,
        };
        polyhedron.validate()?;
        Ok(polyhedron)
    }

    pub fn validate(&self) -> Result<(), PuanError> {
        self.a.validate()?;
        if self.b.len() != self.a.nrows {
            return Err(PuanError::DimensionMismatch {
                context: "polyhedron right-hand side",
                expected: self.a.nrows,
                actual: self.b.len(),
            });
        }
        if self.index.len() != self.a.nrows {
            return Err(PuanError::DimensionMismatch {
                context: "polyhedron row index",
                expected: self.a.nrows,
                actual: self.index.len(),
            });
        }
        // The all-empty polyhedron means "no constraints" and has no columns.
        if !(self.is_empty() && self.variables.is_empty()) && self.variables.len() != self.a.ncols {
            return Err(PuanError::DimensionMismatch {
                context: "polyhedron variables",
                expected: self.a.ncols,
                actual: self.variables.len(),
            });
        }
        self.variables.iter().try_for_each(|v| v.validate())
    }

    /// No rows.
    pub fn is_empty(&self) -> bool {
        self.a.nrows == 0
    }

    pub fn column_of(&self, id: u32) -> Option<usize> {
        self.variables.iter().position(|v| v.id == id)
    }

    /// Lays an id-keyed objective out over the columns. Unknown ids are ignored.
    pub fn objective_vector(&self, objective: &HashMap<u32, f64>) -> Vec<f64> {
        let mut vector = vec![0.0; self.variables.len()];
        for (id, weight) in objective {
            if let Some(col) = self.column_of(*id) {
                vector[col] = *weight;
            }
        }
        vector
    }

    /// `A·x ≥ b` holds (within `1e-9`) and `x` respects the column bounds.
    pub fn is_satisfied_by(&self, x: &[f64]) -> Result<bool, PuanError> {
        let activity = self.a.dot(x)?;
        let rows_ok = activity
            .iter()
            .zip(&self.b)
            .all(|(lhs, rhs)| *lhs >= rhs - 1e-9);
        let bounds_ok = self
            .variables
            .iter()
            .zip(x)
            .all(|(v, &value)| value >= v.bounds.0 - 1e-9 && value <= v.bounds.1 + 1e-9);
        Ok(rows_ok && bounds_ok)
    }

    /// Maximises every objective over the integer points of this polyhedron.
    pub fn solve(&self, objectives: &[HashMap<u32, f64>]) -> Result<Vec<IntegerSolution>, PuanError> {
        self.solve_with(objectives, &SolverConfig::default())
    }

    pub fn solve_with(
        &self,
        objectives: &[HashMap<u32, f64>],
        config: &SolverConfig,
    ) -> Result<Vec<IntegerSolution>, PuanError> {
        objectives
            .iter()
            .map(|objective| {
                let of = self.objective_vector(objective);
                solver::solve_ilp(self, None, &of, config)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_polyhedron() -> Polyhedron {
        // x0 + x1 >= 1, -x0 >= -1
        Polyhedron::new(
            Matrix::new(vec![1.0, 1.0, -1.0, 0.0], 2, 2).unwrap(),
            vec![1.0, -1.0],
            vec![VariableFloat::new(10, (0.0, 1.0)), VariableFloat::new(20, (0.0, 1.0))],
            vec![Some(1), None],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_rhs() {
        let result = Polyhedron::new(
            Matrix::zeros(2, 1),
            vec![0.0],
            vec![VariableFloat::new(0, (0.0, 1.0))],
            vec![None, None],
        );
        assert!(matches!(
            result,
            Err(PuanError::DimensionMismatch { context: "polyhedron right-hand side", .. })
        ));
    }

    #[test]
    fn test_empty_polyhedron_is_valid() {
        assert!(Polyhedron::default().validate().is_ok());
    }

    #[test]
    fn test_objective_vector_ignores_unknown_ids() {
        let ph = small_polyhedron();
        let objective: HashMap<u32, f64> = [(20, 2.5), (99, 1.0)].into_iter().collect();
        assert_eq!(ph.objective_vector(&objective), vec![0.0, 2.5]);
    }

    #[test]
    fn test_is_satisfied_by() {
        let ph = small_polyhedron();
        assert!(ph.is_satisfied_by(&[0.0, 1.0]).unwrap());
        assert!(!ph.is_satisfied_by(&[0.0, 0.0]).unwrap());
        assert!(!ph.is_satisfied_by(&[0.0, 2.0]).unwrap());
    }

    #[test]
    fn test_solve_maximises_each_objective() {
        let ph = small_polyhedron();
        let objectives: Vec<HashMap<u32, f64>> = vec![
            [(10, 1.0), (20, 1.0)].into_iter().collect(),
            [(10, -1.0), (20, -1.0)].into_iter().collect(),
        ];
        let solutions = ph.solve(&objectives).unwrap();
        assert_eq!(solutions[0].x, vec![1, 1]);
        assert_eq!(solutions[0].z, 2);
        assert_eq!(solutions[1].z, -1);
        assert_eq!(solutions[1].status_code, 5);
    }
}

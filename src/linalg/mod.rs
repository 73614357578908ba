//! Dense, row-major matrices for the polyhedral layer.

use serde::{Deserialize, Serialize};

use crate::error::PuanError;

/// A dense `nrows x ncols` matrix stored row by row in `val`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    pub val: Vec<f64>,
    pub nrows: usize,
    pub ncols: usize,
}

impl Matrix {
    /// Creates a matrix, checking that `val` holds exactly `nrows * ncols` entries.
    pub fn new(val: Vec<f64>, nrows: usize, ncols: usize) -> Result<Self, PuanError> {
        let matrix = Self { val, nrows, ncols };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Checks that `val` holds exactly `nrows * ncols` entries.
    pub fn validate(&self) -> Result<(), PuanError> {
        let expected = self
            .nrows
            .checked_mul(self.ncols)
            .ok_or(PuanError::ArithmeticOverflow("matrix dimensions"))?;
        if self.val.len() != expected {
            return Err(PuanError::DimensionMismatch {
                context: "matrix values",
                expected,
                actual: self.val.len(),
            });
        }
        Ok(())
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            val: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.val[row * self.ncols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.val[row * self.ncols + col] = value;
    }

    /// Borrows row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.val[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Matrix-vector product `self * x`.
    pub fn dot(&self, x: &[f64]) -> Result<Vec<f64>, PuanError> {
        if x.len() != self.ncols {
            return Err(PuanError::DimensionMismatch {
                context: "matrix-vector product",
                expected: self.ncols,
                actual: x.len(),
            });
        }
        Ok((0..self.nrows)
            .map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }
}

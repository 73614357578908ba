use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PuanError;

/// An integer decision variable with inclusive bounds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    pub id: u32,
    pub bounds: (i64, i64),
}

impl Variable {
    pub fn new(id: u32, bounds: (i64, i64)) -> Self {
        Self { id, bounds }
    }

    /// A variable bounded to `(0, 1)`.
    pub fn boolean(id: u32) -> Self {
        Self { id, bounds: (0, 1) }
    }

    /// Returns `true` if the variable can only take the values 0 and 1.
    pub fn is_boolean(&self) -> bool {
        self.bounds == (0, 1)
    }

    pub fn validate(&self) -> Result<(), PuanError> {
        if self.bounds.0 > self.bounds.1 {
            return Err(PuanError::InvalidBounds(
                self.bounds.0 as f64,
                self.bounds.1 as f64,
                self.id,
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{} in [{}, {}]", self.id, self.bounds.0, self.bounds.1)
    }
}

/// A polyhedron column. Bounds may be infinite.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VariableFloat {
    pub id: u32,
    pub bounds: (f64, f64),
}

impl VariableFloat {
    pub fn new(id: u32, bounds: (f64, f64)) -> Self {
        Self { id, bounds }
    }

    pub fn validate(&self) -> Result<(), PuanError> {
        let (lower, upper) = self.bounds;
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(PuanError::InvalidBounds(lower, upper, self.id));
        }
        Ok(())
    }
}

impl From<Variable> for VariableFloat {
    fn from(variable: Variable) -> Self {
        VariableFloat {
            id: variable.id,
            bounds: (variable.bounds.0 as f64, variable.bounds.1 as f64),
        }
    }
}

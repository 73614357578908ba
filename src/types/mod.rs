//! This module defines the variable types shared by the logic layer and the
//! polyhedral layer.
//!
//! `Variable` carries integer bounds and is what theories and linear inequalities
//! talk about. `VariableFloat` is the column type of a `Polyhedron`, where bounds
//! are relaxed to `f64` so that unbounded columns can be expressed.

pub mod variable;

// Re-export the main type(s) for easier access.
pub use variable::{Variable, VariableFloat};

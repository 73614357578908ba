// In: src/error.rs

//! This module defines the single, unified error type for the entire puan-rspy library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PuanError {
    // =========================================================================
    // === Package Descriptor Errors
    // =========================================================================
    #[error("Malformed descriptor field '{field}': {reason}")]
    MalformedDescriptor { field: String, reason: String },

    #[error("Malformed requirement '{0}': {1}")]
    MalformedRequirement(String, String),

    #[error("No candidate version of '{name}' satisfies '{constraint}'")]
    Unsatisfiable { name: String, constraint: String },

    // =========================================================================
    // === Logic & Optimisation Errors
    // =========================================================================
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Variable {0} is referenced but never declared")]
    UnknownVariable(u32),

    #[error("Variable {0} is declared more than once")]
    DuplicateVariable(u32),

    #[error("Statement {0} is part of a reference cycle")]
    CyclicTheory(u32),

    #[error("Invalid bounds ({0}, {1}) for variable {2}")]
    InvalidBounds(f64, f64, u32),

    #[error("Statement {0} has an expression but its variable is not boolean")]
    NonBooleanCompound(u32),

    #[error("Integer overflow while building {0}")]
    ArithmeticOverflow(&'static str),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically while loading a theory or config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// The descriptor is not valid TOML or misses required tables.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML render error: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("Invalid semantic version: {0}")]
    Semver(#[from] semver::Error),
}

#[cfg(feature = "python")]
impl From<PuanError> for pyo3::PyErr {
    fn from(err: PuanError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

//! This file is the root of the `puan_rspy` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`theory`, `lineq`,
//!     `polyopt`, etc.) so the Rust compiler knows they exist.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (feature `python`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod config;
pub mod descriptor;
pub mod error;
pub mod linalg;
pub mod lineq;
pub mod polyopt;
pub mod theory;
pub mod types;

#[cfg(feature = "python")]
mod ffi;

pub use error::PuanError;

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use ffi::python::{
    PyAtLeast, PyGeLineq, PyIntegerSolution, PyMatrix, PyPolyhedron, PyStatement, PyTheory,
    PyVariable, PyVariableFloat,
};
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `puan_rspy` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn puan_rspy(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // --- Classes ---
    m.add_class::<PyVariableFloat>()?;
    m.add_class::<PyMatrix>()?;
    m.add_class::<PyPolyhedron>()?;
    m.add_class::<PyTheory>()?;
    m.add_class::<PyVariable>()?;
    m.add_class::<PyStatement>()?;
    m.add_class::<PyAtLeast>()?;
    m.add_class::<PyGeLineq>()?;
    m.add_class::<PyIntegerSolution>()?;

    // --- Expose the custom error type ---
    m.add(
        "PuanError",
        m.py().get_type_bound::<pyo3::exceptions::PyValueError>(),
    )?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;
    m.add_function(wrap_pyfunction!(ffi::package_metadata_py, m)?)?;

    // --- Turn on logging for reductions and the solver ---
    m.add_function(wrap_pyfunction!(ffi::enable_verbose_logging_py, m)?)?;

    Ok(())
}

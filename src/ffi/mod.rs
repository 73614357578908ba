//! Bindings for foreign callers. Python is the only one.

pub mod python;

pub use python::{enable_verbose_logging_py, package_metadata_py};

// In: src/ffi/python.rs

use log::LevelFilter;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::sync::Once;

use crate::config::SolverConfig;
use crate::descriptor::PackageDescriptor;
use crate::linalg::Matrix;
use crate::lineq::GeLineq;
use crate::polyopt::solver::IntegerSolution;
use crate::polyopt::Polyhedron;
use crate::theory::{AtLeast, Sign, Statement, Theory};
use crate::types::{Variable, VariableFloat};

// Every class owns plain Rust values. Arguments are copied in and results copied out.

//==================================================================================
// I. Value Types
//==================================================================================

#[pyclass(name = "MatrixPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyMatrix {
    inner: Matrix,
}

#[pymethods]
impl PyMatrix {
    #[new]
    fn new(val: Vec<f64>, nrows: usize, ncols: usize) -> PyResult<Self> {
        Ok(Self {
            inner: Matrix::new(val, nrows, ncols)?,
        })
    }

    #[getter]
    fn val(&self) -> Vec<f64> {
        self.inner.val.clone()
    }

    #[getter]
    fn nrows(&self) -> usize {
        self.inner.nrows
    }

    #[getter]
    fn ncols(&self) -> usize {
        self.inner.ncols
    }
}

#[pyclass(name = "IntegerSolutionPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyIntegerSolution {
    inner: IntegerSolution,
}

#[pymethods]
impl PyIntegerSolution {
    #[new]
    fn new(status_code: usize, x: Vec<i64>, z: i64) -> Self {
        Self {
            inner: IntegerSolution { x, z, status_code },
        }
    }

    #[getter]
    fn x(&self) -> Vec<i64> {
        self.inner.x.clone()
    }

    #[getter]
    fn z(&self) -> i64 {
        self.inner.z
    }

    #[getter]
    fn status_code(&self) -> usize {
        self.inner.status_code
    }

    fn __repr__(&self) -> String {
        format!(
            "IntegerSolutionPy(status_code={}, x={:?}, z={})",
            self.inner.status_code, self.inner.x, self.inner.z
        )
    }
}

impl From<IntegerSolution> for PyIntegerSolution {
    fn from(inner: IntegerSolution) -> Self {
        Self { inner }
    }
}

#[pyclass(name = "VariableFloatPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyVariableFloat {
    inner: VariableFloat,
}

#[pymethods]
impl PyVariableFloat {
    #[new]
    fn new(id: u32, bounds: (f64, f64)) -> PyResult<Self> {
        let inner = VariableFloat::new(id, bounds);
        inner.validate()?;
        Ok(Self { inner })
    }

    #[getter]
    fn id(&self) -> u32 {
        self.inner.id
    }

    #[getter]
    fn bounds(&self) -> (f64, f64) {
        self.inner.bounds
    }
}

#[pyclass(name = "VariablePy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyVariable {
    inner: Variable,
}

#[pymethods]
impl PyVariable {
    #[new]
    fn new(id: u32, bounds: (i64, i64)) -> PyResult<Self> {
        let inner = Variable::new(id, bounds);
        inner.validate()?;
        Ok(Self { inner })
    }

    #[getter]
    fn id(&self) -> u32 {
        self.inner.id
    }

    #[getter]
    fn bounds(&self) -> (i64, i64) {
        self.inner.bounds
    }
}

//==================================================================================
// II. Polyhedron & Linear Inequalities
//==================================================================================

#[pyclass(name = "PolyhedronPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyPolyhedron {
    inner: Polyhedron,
}

#[pymethods]
impl PyPolyhedron {
    #[new]
    fn new(
        a: PyMatrix,
        b: Vec<f64>,
        variables: Vec<PyVariableFloat>,
        index: Vec<Option<u32>>,
    ) -> PyResult<Self> {
        let variables = variables.into_iter().map(|v| v.inner).collect();
        Ok(Self {
            inner: Polyhedron::new(a.inner, b, variables, index)?,
        })
    }

    #[getter]
    fn a(&self) -> PyMatrix {
        PyMatrix {
            inner: self.inner.a.clone(),
        }
    }

    #[getter]
    fn b(&self) -> Vec<f64> {
        self.inner.b.clone()
    }

    #[getter]
    fn variables(&self) -> Vec<PyVariableFloat> {
        self.inner
            .variables
            .iter()
            .map(|&inner| PyVariableFloat { inner })
            .collect()
    }

    #[getter]
    fn index(&self) -> Vec<Option<u32>> {
        self.inner.index.clone()
    }

    /// Maximises each objective (a dict of variable id to weight) over the integer
    /// points of the polyhedron.
    #[pyo3(signature = (objectives, max_nodes = None))]
    fn solve(
        &self,
        py: Python<'_>,
        objectives: Vec<HashMap<u32, f64>>,
        max_nodes: Option<usize>,
    ) -> PyResult<Vec<PyIntegerSolution>> {
        let config = SolverConfig::default().with_max_nodes(max_nodes);
        let solutions = py.allow_threads(|| self.inner.solve_with(&objectives, &config))?;
        Ok(solutions.into_iter().map(PyIntegerSolution::from).collect())
    }
}

#[pyclass(name = "GeLineqPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyGeLineq {
    inner: GeLineq,
}

#[pymethods]
impl PyGeLineq {
    #[new]
    fn new(
        id: Option<u32>,
        bias: i64,
        bounds: Vec<(i64, i64)>,
        coeffs: Vec<i64>,
        indices: Vec<u32>,
    ) -> PyResult<Self> {
        Ok(Self {
            inner: GeLineq::new(id, bias, bounds, coeffs, indices)?,
        })
    }

    #[getter]
    fn id(&self) -> Option<u32> {
        self.inner.id
    }

    #[getter]
    fn bias(&self) -> i64 {
        self.inner.bias
    }

    #[getter]
    fn bounds(&self) -> Vec<(i64, i64)> {
        self.inner.bounds.clone()
    }

    #[getter]
    fn coeffs(&self) -> Vec<i64> {
        self.inner.coeffs.clone()
    }

    #[getter]
    fn indices(&self) -> Vec<u32> {
        self.inner.indices.clone()
    }

    /// One inequality equivalent to `self or other`, or `None` if there is none of
    /// this form.
    fn merge_disj(&self, other: PyGeLineq) -> Option<PyGeLineq> {
        GeLineq::merge_disj(&self.inner, &other.inner).map(|inner| PyGeLineq { inner })
    }

    /// One inequality equivalent to `self and other`, or `None`.
    fn merge_conj(&self, other: PyGeLineq) -> Option<PyGeLineq> {
        GeLineq::merge_conj(&self.inner, &other.inner).map(|inner| PyGeLineq { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "GeLineqPy(id={:?}, bias={}, coeffs={:?}, indices={:?})",
            self.inner.id, self.inner.bias, self.inner.coeffs, self.inner.indices
        )
    }
}

//==================================================================================
// III. Theory
//==================================================================================

#[pyclass(name = "AtLeastPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyAtLeast {
    inner: AtLeast,
}

#[pymethods]
impl PyAtLeast {
    /// `sign` is `1` ("at least", the default) or `-1` ("at most").
    #[new]
    #[pyo3(signature = (ids, bias, sign = 1))]
    fn new(ids: Vec<u32>, bias: i64, sign: i64) -> PyResult<Self> {
        let sign = match sign {
            1 => Sign::Positive,
            -1 => Sign::Negative,
            _ => return Err(PyValueError::new_err("Invalid sign. Must be 1 or -1.")),
        };
        Ok(Self {
            inner: AtLeast::with_sign(ids, bias, sign),
        })
    }

    #[getter]
    fn ids(&self) -> Vec<u32> {
        self.inner.ids.clone()
    }

    #[getter]
    fn bias(&self) -> i64 {
        self.inner.bias
    }

    #[getter]
    fn sign(&self) -> i64 {
        self.inner.sign.factor()
    }
}

#[pyclass(name = "StatementPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyStatement {
    inner: Statement,
}

#[pymethods]
impl PyStatement {
    #[new]
    #[pyo3(signature = (id, bounds, expression = None))]
    fn new(id: u32, bounds: (i64, i64), expression: Option<PyAtLeast>) -> PyResult<Self> {
        let variable = Variable::new(id, bounds);
        variable.validate()?;
        Ok(Self {
            inner: Statement {
                variable,
                expression: expression.map(|e| e.inner),
            },
        })
    }

    #[getter]
    fn variable(&self) -> PyVariable {
        PyVariable {
            inner: self.inner.variable,
        }
    }

    #[getter]
    fn expression(&self) -> Option<PyAtLeast> {
        self.inner
            .expression
            .clone()
            .map(|inner| PyAtLeast { inner })
    }
}

#[pyclass(name = "TheoryPy", module = "puan_rspy")]
#[derive(Clone)]
pub struct PyTheory {
    inner: Theory,
}

#[pymethods]
impl PyTheory {
    #[new]
    #[pyo3(signature = (statements, id = String::new()))]
    fn new(statements: Vec<PyStatement>, id: String) -> Self {
        Self {
            inner: Theory::new(id, statements.into_iter().map(|s| s.inner).collect()),
        }
    }

    #[getter]
    fn id(&self) -> String {
        self.inner.id.clone()
    }

    #[getter]
    fn statements(&self) -> Vec<PyStatement> {
        self.inner
            .statements
            .iter()
            .cloned()
            .map(|inner| PyStatement { inner })
            .collect()
    }

    fn to_lineqs(&self, active: bool, reduced: bool) -> PyResult<Vec<PyGeLineq>> {
        let lineqs = self.inner.to_lineqs(active, reduced)?;
        Ok(lineqs.into_iter().map(|inner| PyGeLineq { inner }).collect())
    }

    fn to_ge_polyhedron(&self, active: bool, reduced: bool) -> PyResult<PyPolyhedron> {
        Ok(PyPolyhedron {
            inner: self.inner.to_ge_polyhedron(active, reduced)?,
        })
    }

    /// Maximises each objective over the active theory. `x` of every solution
    /// covers all theory variables in statement order.
    #[pyo3(signature = (objectives, reduce_polyhedron, max_nodes = None))]
    fn solve(
        &self,
        py: Python<'_>,
        objectives: Vec<HashMap<u32, f64>>,
        reduce_polyhedron: bool,
        max_nodes: Option<usize>,
    ) -> PyResult<Vec<PyIntegerSolution>> {
        let config = SolverConfig::default().with_max_nodes(max_nodes);
        let solutions = py.allow_threads(|| {
            self.inner
                .solve_with(objectives, reduce_polyhedron, &config)
        })?;
        Ok(solutions.into_iter().map(PyIntegerSolution::from).collect())
    }

    fn to_json(&self) -> PyResult<String> {
        Ok(self.inner.to_json()?)
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        Ok(Self {
            inner: Theory::from_json(json)?,
        })
    }
}

//==================================================================================
// IV. Module Functions
//==================================================================================

/// The core metadata record of the installed package.
#[pyfunction]
#[pyo3(name = "package_metadata")]
pub fn package_metadata_py() -> PyResult<String> {
    Ok(PackageDescriptor::embedded()?.metadata_record())
}

static INIT_LOGGER: Once = Once::new();

/// Routes the crate's `log` output (reductions, branch and bound, metrics) to
/// stderr, or appends it to `log_file`. Only the first call configures the logger.
#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None))]
pub fn enable_verbose_logging_py(log_file: Option<String>) -> PyResult<()> {
    let file = match log_file {
        Some(path) => Some(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .map_err(|e| {
                    PyIOError::new_err(format!("Could not open log file '{}': {}", path, e))
                })?,
        ),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Debug);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}

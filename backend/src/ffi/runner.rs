//! PyO3 wrapper around the run driver

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::driver::{CancellationToken, RunConfig, RunDriver, RunError, RunOutcome, RunReport, RunRequest};
use crate::event::{OutputFormat, Precision};
use crate::params::ParameterDictionary;
use crate::registry::Registry;
use crate::search::{SearchPath, SEARCH_PATH_ENV};

/// Python entry point for generator runs
///
/// # Example (from Python)
///
/// ```python
/// from evgen_core import Runner
///
/// runner = Runner()
/// print(runner.list_generators())
/// report = runner.run("p1", "p:900,pbar:900", 100, params={"MSTP(41)": "0"}, output="run.txt")
/// print(report["status"], report["generated"])
/// ```
#[pyclass(name = "Runner")]
pub struct PyRunner {
    registry: Registry,
}

#[pymethods]
impl PyRunner {
    /// Create a runner over the built-in engines
    ///
    /// `search_path` replaces the standard search path when given.
    #[new]
    #[pyo3(signature = (search_path=None))]
    fn new(search_path: Option<Vec<String>>) -> PyResult<Self> {
        let search = match search_path {
            Some(dirs) => SearchPath::new(dirs.into_iter().map(PathBuf::from)),
            None => {
                let cwd = std::env::current_dir().map_err(|e| PyIOError::new_err(e.to_string()))?;
                SearchPath::standard(cwd, std::env::var_os(SEARCH_PATH_ENV).as_deref())
            }
        };
        Ok(Self {
            registry: Registry::with_builtin(search),
        })
    }

    /// Generator names that can be loaded right now
    fn list_generators(&self) -> Vec<String> {
        self.registry.resolvable()
    }

    /// Run one generator and return a summary dict
    ///
    /// Events are written to `output` when given and discarded otherwise.
    ///
    /// # Errors
    ///
    /// Raises ValueError for configuration errors, IOError when the output
    /// file cannot be created, RuntimeError when the generator cannot be
    /// loaded. An aborted run is not an exception; check `status`.
    #[pyo3(signature = (generator, beams, num_events, params=None, seed=None, filter_level=0, output=None, precision=8, format="ascii"))]
    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        py: Python<'_>,
        generator: &str,
        beams: &str,
        num_events: u64,
        params: Option<&Bound<'_, PyDict>>,
        seed: Option<u64>,
        filter_level: u8,
        output: Option<PathBuf>,
        precision: u8,
        format: &str,
    ) -> PyResult<Py<PyDict>> {
        let mut dict = ParameterDictionary::new();
        if let Some(params) = params {
            for (key, value) in params.iter() {
                dict.insert(key.extract::<String>()?, value.str()?.to_string());
            }
        }

        let config = RunConfig::resolve(RunRequest {
            generator: generator.to_string(),
            beams: Some(beams.to_string()),
            seed,
            num_events,
            filter_level,
            params: dict,
        })
        .map_err(run_error_to_py)?;

        let precision = Precision::new(precision)
            .ok_or_else(|| PyValueError::new_err(format!("precision must be 1..={}", Precision::MAX)))?;
        let format: OutputFormat = format.parse().map_err(PyValueError::new_err)?;
        let mut writer = match output {
            Some(path) => {
                let file = File::create(&path).map_err(|e| PyIOError::new_err(e.to_string()))?;
                format.writer(BufWriter::new(file), precision)
            }
            None => format.writer(std::io::sink(), precision),
        };

        let report = RunDriver::new(&self.registry, CancellationToken::new())
            .run(&config, writer.as_mut())
            .map_err(run_error_to_py)?;

        report_to_py(py, &report)
    }
}

fn run_error_to_py(err: RunError) -> PyErr {
    match err {
        RunError::Registry(e) => PyRuntimeError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Convert a run report to a flat Python dict
pub fn report_to_py(py: Python<'_>, report: &RunReport) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("run_id", &report.run_id)?;
    dict.set_item("generator", &report.generator)?;

    let (status, cause) = match &report.outcome {
        RunOutcome::Completed => ("completed", None),
        RunOutcome::Interrupted { .. } => ("interrupted", None),
        RunOutcome::Aborted { cause } => ("aborted", Some(cause.to_string())),
    };
    dict.set_item("status", status)?;
    dict.set_item("cause", cause)?;
    dict.set_item("exit_code", report.exit_code())?;

    dict.set_item("seed", report.state.seed)?;
    dict.set_item("requested", report.state.requested)?;
    dict.set_item("generated", report.state.generated)?;
    dict.set_item("failed", report.state.failed)?;
    dict.set_item("filter_level", report.state.filter_level)?;
    dict.set_item("cancelled", report.state.cancelled)?;
    dict.set_item("config_fingerprint", &report.config_fingerprint)?;

    Ok(dict.unbind())
}

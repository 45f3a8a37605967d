//! Python bindings.

use std::path::PathBuf;
use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{CtgConfig, ScheduleKind};
use crate::driver::JobScheduler;
use crate::facts::{ClassFactProvider, ClassFacts, ClassKind, InMemoryFacts};
use crate::models::JobDefinition;
use crate::project::ProjectStaticData;
use crate::timeouts::PhaseTimeouts;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Facts about one class of the project under test.
#[pyclass(name = "ClassFacts")]
#[derive(Clone, Debug)]
pub struct PyClassFacts {
    #[pyo3(get, set)]
    pub name: String,
    /// "interface", "abstract" or "concrete"
    #[pyo3(get, set)]
    pub kind: String,
    #[pyo3(get, set)]
    pub branches: u32,
    #[pyo3(get, set)]
    pub has_code: bool,
    #[pyo3(get, set)]
    pub superclass: Option<String>,
    #[pyo3(get, set)]
    pub interfaces: Vec<String>,
    #[pyo3(get, set)]
    pub parameter_types: Vec<String>,
    #[pyo3(get, set)]
    pub field_types: Vec<String>,
    #[pyo3(get, set)]
    pub cast_types: Vec<String>,
}

#[pymethods]
impl PyClassFacts {
    #[new]
    #[pyo3(signature = (
        name,
        branches,
        kind="concrete".to_string(),
        has_code=true,
        superclass=None,
        interfaces=Vec::new(),
        parameter_types=Vec::new(),
        field_types=Vec::new(),
        cast_types=Vec::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        branches: u32,
        kind: String,
        has_code: bool,
        superclass: Option<String>,
        interfaces: Vec<String>,
        parameter_types: Vec<String>,
        field_types: Vec<String>,
        cast_types: Vec<String>,
    ) -> Self {
        Self {
            name,
            kind,
            branches,
            has_code,
            superclass,
            interfaces,
            parameter_types,
            field_types,
            cast_types,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ClassFacts(name={}, kind={}, branches={}, has_code={})",
            self.name, self.kind, self.branches, self.has_code
        )
    }
}

impl PyClassFacts {
    fn to_facts(&self) -> PyResult<ClassFacts> {
        let kind = match self.kind.to_ascii_lowercase().as_str() {
            "interface" => ClassKind::Interface,
            "abstract" => ClassKind::Abstract,
            "concrete" => ClassKind::Concrete,
            other => return Err(value_error(format!("Unknown class kind: {other}"))),
        };

        let mut facts = ClassFacts::new(self.name.clone(), kind, self.branches, self.has_code);
        facts.superclass = self.superclass.clone();
        facts.interfaces = self.interfaces.clone();
        facts.parameter_types = self.parameter_types.clone();
        facts.field_types = self.field_types.clone();
        facts.cast_types = self.cast_types.clone();
        Ok(facts)
    }
}

/// One scheduled test generation job.
#[pyclass(name = "JobDefinition")]
#[derive(Clone, Debug)]
pub struct PyJobDefinition {
    #[pyo3(get)]
    pub cut: String,
    #[pyo3(get)]
    pub seconds: u64,
    #[pyo3(get)]
    pub memory_mb: u32,
    #[pyo3(get)]
    pub input_dependencies: Vec<String>,
    #[pyo3(get)]
    pub ancestor_dependencies: Vec<String>,
}

#[pymethods]
impl PyJobDefinition {
    /// Phase timeouts for this job as `{property: seconds}`.
    #[pyo3(signature = (min_seconds_per_job, remaining_seconds=None))]
    fn phase_timeouts(
        &self,
        min_seconds_per_job: u64,
        remaining_seconds: Option<u64>,
    ) -> Vec<(&'static str, u64)> {
        PhaseTimeouts::for_job(self.seconds, remaining_seconds, min_seconds_per_job)
            .as_properties()
            .to_vec()
    }

    fn __repr__(&self) -> String {
        format!(
            "JobDefinition(cut={}, seconds={}, memory_mb={})",
            self.cut, self.seconds, self.memory_mb
        )
    }
}

impl From<&JobDefinition> for PyJobDefinition {
    fn from(job: &JobDefinition) -> Self {
        Self {
            cut: job.cut().to_string(),
            seconds: job.seconds(),
            memory_mb: job.memory_mb(),
            input_dependencies: job.input_dependencies().iter().cloned().collect(),
            ancestor_dependencies: job.ancestor_dependencies().iter().cloned().collect(),
        }
    }
}

/// Scheduler configuration.
#[pyclass(name = "SchedulerConfig")]
#[derive(Clone, Debug)]
pub struct PySchedulerConfig {
    #[pyo3(get, set)]
    pub time_in_minutes: u32,
    #[pyo3(get, set)]
    pub number_of_usable_cores: u32,
    #[pyo3(get, set)]
    pub min_minutes_per_job: u32,
    #[pyo3(get, set)]
    pub constant_memory_per_job: u32,
    #[pyo3(get, set)]
    pub schedule_kind: String,
    #[pyo3(get, set)]
    pub history_file: Option<String>,
    #[pyo3(get, set)]
    pub coverage_history_file: Option<String>,
    #[pyo3(get, set)]
    pub verbosity: u8,
}

#[pymethods]
impl PySchedulerConfig {
    #[new]
    #[pyo3(signature = (
        time_in_minutes=2,
        number_of_usable_cores=1,
        min_minutes_per_job=1,
        constant_memory_per_job=1000,
        schedule_kind="BUDGET_AND_SEEDING".to_string(),
        history_file=None,
        coverage_history_file=None,
        verbosity=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        time_in_minutes: u32,
        number_of_usable_cores: u32,
        min_minutes_per_job: u32,
        constant_memory_per_job: u32,
        schedule_kind: String,
        history_file: Option<String>,
        coverage_history_file: Option<String>,
        verbosity: u8,
    ) -> Self {
        Self {
            time_in_minutes,
            number_of_usable_cores,
            min_minutes_per_job,
            constant_memory_per_job,
            schedule_kind,
            history_file,
            coverage_history_file,
            verbosity,
        }
    }
}

impl PySchedulerConfig {
    fn to_config(&self) -> PyResult<CtgConfig> {
        let schedule_kind: ScheduleKind = self.schedule_kind.parse().map_err(value_error)?;
        Ok(CtgConfig {
            time_in_minutes: self.time_in_minutes,
            number_of_usable_cores: self.number_of_usable_cores,
            min_minutes_per_job: self.min_minutes_per_job,
            constant_memory_per_job: self.constant_memory_per_job,
            schedule_kind,
            history_file: self.history_file.as_ref().map(PathBuf::from),
            coverage_history_file: self.coverage_history_file.as_ref().map(PathBuf::from),
            verbosity: self.verbosity,
        })
    }
}

/// Build the schedule for a project described by `classes`.
///
/// # Raises
/// * ValueError on an invalid configuration, unreadable history, or a failed graph query
#[pyfunction]
fn create_schedule(
    classes: Vec<PyClassFacts>,
    config: PySchedulerConfig,
) -> PyResult<Vec<PyJobDefinition>> {
    let config = config.to_config()?;
    let facts = classes
        .iter()
        .map(PyClassFacts::to_facts)
        .collect::<PyResult<Vec<_>>>()?;

    let provider: Arc<dyn ClassFactProvider> = Arc::new(InMemoryFacts::new(facts));
    let data = ProjectStaticData::analyze(provider, config.verbosity);

    let mut scheduler = JobScheduler::new(config, data).map_err(value_error)?;
    let jobs = scheduler.create_new_schedule().map_err(value_error)?;
    Ok(jobs.iter().map(PyJobDefinition::from).collect())
}

/// The ctg_scheduler Python module.
#[pymodule]
fn ctg_scheduler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyClassFacts>()?;
    m.add_class::<PyJobDefinition>()?;
    m.add_class::<PySchedulerConfig>()?;

    m.add_function(wrap_pyfunction!(create_schedule, m)?)?;

    Ok(())
}

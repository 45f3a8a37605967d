//! Scheduler for continuous test generation (CTG).
//!
//! Given the classes of a project, a time budget and a number of cores, this
//! crate decides which classes under test (CUTs) get a test generation job,
//! how many seconds each job gets, and in which order the jobs run.
//!
//! Data flows from a [`ClassFactProvider`] into [`ProjectStaticData`], whose
//! lazily built [`ProjectGraph`] answers the dependency queries the Seeding
//! strategy needs. A [`JobScheduler`] picks a [`ScheduleType`] from the
//! configuration and produces the ordered [`JobDefinition`] list.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

mod config;
mod driver;
mod facts;
pub mod logging;
mod models;
pub mod project;
pub mod schedule;
mod timeouts;

#[cfg(feature = "python")]
mod python;

pub use config::{ConfigError, CtgConfig, ScheduleKind};
pub use driver::{JobScheduler, ScheduleSummary, SchedulerError};
pub use facts::{ClassFactProvider, ClassFacts, ClassKind, FactError, InMemoryFacts, InheritanceEdge};
pub use models::{ClassInfo, JobDefinition};
pub use project::{GraphError, History, HistoryError, ProjectGraph, ProjectStaticData};
pub use schedule::{
    distribute_extra_budget_evenly, sort_to_satisfy_dependencies, BudgetSchedule,
    HistorySchedule, OneTimeSchedule, ScheduleBase, ScheduleError, ScheduleType,
    SeedingSchedule, SimpleSchedule,
};
pub use timeouts::PhaseTimeouts;

#[doc(hidden)]
pub use log as __log;

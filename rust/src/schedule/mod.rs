//! Budgeting and ordering strategies.
//!
//! Every strategy turns "N CUTs, T minutes, C cores" into an ordered list of
//! [`JobDefinition`]s. All current strategies are one-shot: they compute the
//! whole schedule in a single call.

mod budget;
mod dependency_sort;
mod history;
mod seeding;
mod simple;

use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::config::CtgConfig;
use crate::log_changes;
use crate::models::{ClassInfo, JobDefinition};
use crate::project::{GraphError, ProjectStaticData};

pub use budget::BudgetSchedule;
pub use dependency_sort::sort_to_satisfy_dependencies;
pub use history::{HistorySchedule, MODIFIED, NOT_MODIFIED};
pub use seeding::SeedingSchedule;
pub use simple::SimpleSchedule;

/// Errors that can occur while building a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Schedule has already been executed")]
    AlreadyExecuted,
    #[error("Project graph query failed: {0}")]
    Graph(#[from] GraphError),
}

/// A strategy producing the jobs to run.
pub trait ScheduleType {
    /// Produce the next (possibly only) batch of ordered jobs.
    fn create_new_schedule(&mut self) -> Result<Vec<JobDefinition>, ScheduleError>;

    /// Whether more schedule phases are left.
    fn can_execute_more(&self) -> bool;
}

/// Configuration and project data shared by every strategy.
#[derive(Clone, Debug)]
pub struct ScheduleBase {
    config: CtgConfig,
    data: Arc<ProjectStaticData>,
    executed: bool,
}

impl ScheduleBase {
    /// `config` must already be validated; see [`CtgConfig::validate`].
    pub fn new(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "invalid scheduler configuration: {:?}",
            config.validate()
        );
        Self {
            config,
            data,
            executed: false,
        }
    }

    pub fn config(&self) -> &CtgConfig {
        &self.config
    }

    pub fn data(&self) -> &ProjectStaticData {
        &self.data
    }

    pub fn total_budget(&self) -> u64 {
        self.config.total_budget_seconds()
    }

    pub fn maximum_budget_per_core(&self) -> u64 {
        self.config.maximum_budget_per_core()
    }

    /// Never zero, so every produced job has a positive budget.
    pub fn min_seconds_per_job(&self) -> u64 {
        self.config.min_seconds_per_job().max(1)
    }

    pub fn memory_per_job(&self) -> u32 {
        self.config.constant_memory_per_job
    }

    pub fn verbosity(&self) -> u8 {
        self.config.verbosity
    }

    /// How many jobs fit in the total budget when each gets the minimum.
    pub fn maximum_number_of_jobs(&self) -> u64 {
        self.total_budget() / self.min_seconds_per_job()
    }

    /// Whether `cuts` CUTs can each get at least the minimum budget.
    pub fn enough_budget_for(&self, cuts: usize) -> bool {
        self.maximum_number_of_jobs() >= cuts as u64
    }

    /// Degraded schedule: `candidates` in the given (discovery) order, each at
    /// the minimum budget, until the total budget runs out. The rest get no job.
    pub fn create_schedule_for_when_not_enough_budget(
        &self,
        candidates: &[&ClassInfo],
    ) -> Vec<JobDefinition> {
        let total = self.total_budget();
        let min = self.min_seconds_per_job();
        let cuts = candidates.len();

        let mut used = 0;
        let mut jobs = Vec::new();
        for info in candidates {
            if used + min > total {
                break;
            }
            used += min;
            jobs.push(JobDefinition::new(info.name(), min, self.memory_per_job()));
        }

        // TODO: prefer dropping CUTs with few branches over the last discovered ones
        warn!(
            "Not enough budget to test all {} CUTs: {} jobs of {} s fit in {} s, {} CUTs dropped",
            cuts,
            jobs.len(),
            min,
            total,
            cuts - jobs.len()
        );
        jobs
    }

    fn mark_executed(&mut self) -> Result<(), ScheduleError> {
        if self.executed {
            return Err(ScheduleError::AlreadyExecuted);
        }
        self.executed = true;
        Ok(())
    }
}

/// A strategy that computes its whole schedule exactly once.
pub trait OneTimeSchedule {
    fn name(&self) -> &'static str;

    fn base(&self) -> &ScheduleBase;

    fn base_mut(&mut self) -> &mut ScheduleBase;

    /// CUTs this strategy may schedule at all, in discovery order.
    ///
    /// Budget sufficiency and the degraded schedule only consider these.
    fn candidate_cuts(&self) -> Vec<&ClassInfo> {
        self.base().data().testable_class_infos().collect()
    }

    /// Full schedule. Only called when every candidate CUT fits at the minimum budget.
    fn create_schedule(&self) -> Vec<JobDefinition>;

    /// Applied to both the full and the degraded schedule.
    fn post_process(&self, jobs: Vec<JobDefinition>) -> Result<Vec<JobDefinition>, ScheduleError> {
        Ok(jobs)
    }
}

impl<T: OneTimeSchedule + ?Sized> ScheduleType for T {
    fn create_new_schedule(&mut self) -> Result<Vec<JobDefinition>, ScheduleError> {
        self.base_mut().mark_executed()?;

        let candidates = self.candidate_cuts();
        let base = self.base();
        let jobs = if base.enough_budget_for(candidates.len()) {
            self.create_schedule()
        } else {
            base.create_schedule_for_when_not_enough_budget(&candidates)
        };
        let jobs = self.post_process(jobs)?;

        log_changes!(
            self.base().verbosity(),
            "{} schedule: {} jobs, {} s in total",
            self.name(),
            jobs.len(),
            jobs.iter().map(JobDefinition::seconds).sum::<u64>()
        );
        Ok(jobs)
    }

    fn can_execute_more(&self) -> bool {
        !self.base().executed
    }
}

/// Spread `leftover` seconds over the jobs still below `maximum_budget_per_core`.
///
/// Each round gives every uncapped job an even share (at least one second,
/// so integer remainders are handed out too), never pushing a job past the
/// cap. Stops when nothing is left or every job is capped.
pub fn distribute_extra_budget_evenly(
    mut jobs: Vec<JobDefinition>,
    mut leftover: u64,
    maximum_budget_per_core: u64,
) -> Vec<JobDefinition> {
    while leftover > 0 {
        let uncapped = jobs
            .iter()
            .filter(|j| j.seconds() < maximum_budget_per_core)
            .count() as u64;
        if uncapped == 0 {
            break;
        }
        let per_job = (leftover / uncapped).max(1);

        for job in jobs.iter_mut() {
            if leftover == 0 {
                break;
            }
            if job.seconds() >= maximum_budget_per_core {
                continue;
            }
            let extra = per_job
                .min(maximum_budget_per_core - job.seconds())
                .min(leftover);
            *job = job.with_added_budget(extra);
            leftover -= extra;
        }
    }

    jobs
}

/// Most expensive jobs first; ties keep their current order.
pub(crate) fn sort_by_budget_descending(jobs: &mut [JobDefinition]) {
    jobs.sort_by(|a, b| b.seconds().cmp(&a.seconds()));
}

//! History-adaptive budget allocation.

use std::sync::Arc;

use crate::config::CtgConfig;
use crate::models::{ClassInfo, JobDefinition};
use crate::project::ProjectStaticData;
use crate::{log_changes, log_checks};

use super::budget::BranchBudget;
use super::{
    distribute_extra_budget_evenly, sort_by_budget_descending, OneTimeSchedule, ScheduleBase,
};

/// Budget multiplier for a CUT whose source changed since the last run.
pub const MODIFIED: f64 = 2.0;
/// Budget multiplier for an unchanged CUT whose coverage still improves.
pub const NOT_MODIFIED: f64 = 1.0;

/// Unchanged and no longer gaining coverage: not worth another job.
fn is_stalled(info: &ClassInfo) -> bool {
    !info.has_changed() && !info.has_coverage_improved()
}

/// Branch-proportional budgets, reweighted by change and coverage history.
///
/// Changed CUTs get twice the budget. Unchanged CUTs whose coverage has
/// stalled (or is complete) are not scheduled at all. Without any history
/// this behaves like the Budget strategy.
#[derive(Clone, Debug)]
pub struct HistorySchedule {
    base: ScheduleBase,
}

impl HistorySchedule {
    pub fn new(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        Self {
            base: ScheduleBase::new(config, data),
        }
    }
}

impl OneTimeSchedule for HistorySchedule {
    fn name(&self) -> &'static str {
        "History"
    }

    fn base(&self) -> &ScheduleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScheduleBase {
        &mut self.base
    }

    fn candidate_cuts(&self) -> Vec<&ClassInfo> {
        self.base
            .data()
            .testable_class_infos()
            .filter(|info| !is_stalled(info))
            .collect()
    }

    fn create_schedule(&self) -> Vec<JobDefinition> {
        let data = self.base.data();
        let verbosity = self.base.verbosity();
        let maximum = self.base.maximum_budget_per_core();
        let total_budget = self.base.total_budget();
        let plan = BranchBudget::compute(&self.base);

        if !data.has_history() {
            log_changes!(verbosity, "No history available, using plain branch budgets");
        }

        let mut total_left_over = plan.unassigned;
        let mut jobs = Vec::new();
        for info in data.testable_class_infos() {
            if is_stalled(info) {
                log_checks!(
                    verbosity,
                    "Skipping {}: unchanged and coverage not improving",
                    info.name()
                );
                continue;
            }

            let multiplier = if data.has_history() && info.has_changed() {
                MODIFIED
            } else {
                NOT_MODIFIED
            };

            let mut budget = plan.budget_for(info.number_of_branches(), multiplier);
            if budget > maximum {
                total_left_over += budget - maximum;
                budget = maximum;
            }
            jobs.push(JobDefinition::new(
                info.name(),
                budget,
                self.base.memory_per_job(),
            ));
        }

        if total_left_over > 0 {
            jobs = distribute_extra_budget_evenly(jobs, total_left_over, maximum);
        }
        sort_by_budget_descending(&mut jobs);

        // Multipliers can overshoot the total; keep the jobs that fit
        let mut used = 0;
        let mut accepted = Vec::with_capacity(jobs.len());
        for job in jobs {
            if used + job.seconds() > total_budget {
                log_checks!(
                    verbosity,
                    "Budget exhausted at {}, dropping remaining jobs",
                    job.cut()
                );
                break;
            }
            used += job.seconds();
            accepted.push(job);
        }
        accepted
    }
}

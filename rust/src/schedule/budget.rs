//! Branch-proportional budget allocation.

use std::sync::Arc;

use crate::config::CtgConfig;
use crate::log_checks;
use crate::models::JobDefinition;
use crate::project::ProjectStaticData;

use super::{
    distribute_extra_budget_evenly, sort_by_budget_descending, OneTimeSchedule, ScheduleBase,
};

/// Per-CUT minimum plus a share of the extra time for every branch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BranchBudget {
    pub min_time_per_cut: u64,
    pub time_per_branch: f64,
    /// Extra time no branch could absorb (the project has no branches at all)
    pub unassigned: u64,
}

impl BranchBudget {
    pub fn compute(base: &ScheduleBase) -> Self {
        let data = base.data();
        let min_time_per_cut = base.min_seconds_per_job();
        let min_time = min_time_per_cut * data.total_number_of_testable_cuts() as u64;
        let extra_time = base.total_budget().saturating_sub(min_time);
        let total_branches = data.total_number_of_branches();

        if total_branches == 0 {
            Self {
                min_time_per_cut,
                time_per_branch: 0.0,
                unassigned: extra_time,
            }
        } else {
            Self {
                min_time_per_cut,
                time_per_branch: extra_time as f64 / total_branches as f64,
                unassigned: 0,
            }
        }
    }

    /// Uncapped budget of a CUT with `branches` branches, scaled by `multiplier`.
    pub fn budget_for(&self, branches: u32, multiplier: f64) -> u64 {
        let budget = self.min_time_per_cut as f64 + f64::from(branches) * self.time_per_branch;
        (budget * multiplier) as u64
    }
}

/// Allocates budget proportionally to each CUT's branch count.
///
/// Jobs are returned most expensive first, so long jobs start early and
/// keep all cores busy.
#[derive(Clone, Debug)]
pub struct BudgetSchedule {
    base: ScheduleBase,
}

impl BudgetSchedule {
    pub fn new(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        Self {
            base: ScheduleBase::new(config, data),
        }
    }
}

impl OneTimeSchedule for BudgetSchedule {
    fn name(&self) -> &'static str {
        "Budget"
    }

    fn base(&self) -> &ScheduleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScheduleBase {
        &mut self.base
    }

    fn create_schedule(&self) -> Vec<JobDefinition> {
        let maximum = self.base.maximum_budget_per_core();
        let plan = BranchBudget::compute(&self.base);

        let mut total_left_over = plan.unassigned;
        let mut jobs = Vec::new();
        for info in self.base.data().testable_class_infos() {
            let mut budget = plan.budget_for(info.number_of_branches(), 1.0);
            if budget > maximum {
                total_left_over += budget - maximum;
                budget = maximum;
            }
            log_checks!(
                self.base.verbosity(),
                "{}: {} branches -> {} s",
                info.name(),
                info.number_of_branches(),
                budget
            );
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
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ScheduleType;
    use super::*;
    use crate::facts::{ClassFacts, ClassKind};

    #[test]
    fn test_branch_proportional_example() {
        // Middle class has no code and never becomes a job
        let data = make_data(vec![
            ClassFacts::concrete("ex.A", 10),
            ClassFacts::new("ex.Marker", ClassKind::Interface, 0, false),
            ClassFacts::concrete("ex.B", 5),
        ]);
        let base = ScheduleBase::new(make_config(10, 1, 1), Arc::clone(&data));
        let plan = BranchBudget::compute(&base);
        assert_eq!(plan.min_time_per_cut, 60);
        assert_eq!(plan.time_per_branch, 32.0);

        let mut schedule = BudgetSchedule::new(make_config(10, 1, 1), data);
        let jobs = schedule.create_new_schedule().unwrap();
        assert_eq!(cuts_of(&jobs), vec!["ex.A", "ex.B"]);
        assert_eq!(seconds_of(&jobs), vec![380, 220]);
        assert_eq!(jobs.iter().map(JobDefinition::seconds).sum::<u64>(), 600);
        assert!(jobs.iter().all(|j| j.memory_mb() == 1000));
    }

    #[test]
    fn test_sorted_descending_by_budget() {
        let mut schedule = BudgetSchedule::new(make_config(30, 2, 1), make_cuts(&[1, 20, 5, 9]));
        let jobs = schedule.create_new_schedule().unwrap();
        assert_eq!(cuts_of(&jobs), vec!["c.C1", "c.C3", "c.C2", "c.C0"]);
        let seconds = seconds_of(&jobs);
        assert!(seconds.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_capped_budget_is_redistributed() {
        // 2 cores x 10 minutes = 1200 s, cap 600 s per job.
        // C0: 60 + 100 * 8.16 s is above the cap, the excess goes to C1 and C2
        let mut schedule = BudgetSchedule::new(make_config(10, 2, 1), make_cuts(&[100, 10, 15]));
        let jobs = schedule.create_new_schedule().unwrap();

        assert!(jobs.iter().all(|j| j.seconds() > 0 && j.seconds() <= 600));
        assert_eq!(jobs[0].cut(), "c.C0");
        assert_eq!(jobs[0].seconds(), 600);
        let total: u64 = jobs.iter().map(JobDefinition::seconds).sum();
        assert!(total <= 1200 && total >= 1200 - jobs.len() as u64);
    }

    #[test]
    fn test_no_branches_splits_extra_time_evenly() {
        let mut schedule = BudgetSchedule::new(make_config(10, 1, 1), make_cuts(&[0, 0, 0]));
        let jobs = schedule.create_new_schedule().unwrap();
        assert_eq!(seconds_of(&jobs), vec![200, 200, 200]);
    }

    #[test]
    fn test_no_cuts_gives_empty_schedule() {
        let mut schedule = BudgetSchedule::new(make_config(10, 1, 1), make_cuts(&[]));
        assert!(schedule.create_new_schedule().unwrap().is_empty());
    }
}

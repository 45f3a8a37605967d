//! Dependency-aware reordering on top of another strategy.

use std::sync::Arc;

use crate::config::CtgConfig;
use crate::log_checks;
use crate::models::{ClassInfo, JobDefinition};
use crate::project::{ProjectGraph, ProjectStaticData};

use super::{
    sort_to_satisfy_dependencies, BudgetSchedule, OneTimeSchedule, ScheduleBase, ScheduleError,
    SimpleSchedule,
};

/// Keeps the budgets of the wrapped strategy and reorders its jobs so a CUT
/// runs after the CUTs it takes as input and its ancestors, letting their
/// generated tests seed its search.
pub struct SeedingSchedule {
    base: ScheduleBase,
    inner: Box<dyn OneTimeSchedule + Send + Sync>,
}

impl SeedingSchedule {
    pub fn new(inner: Box<dyn OneTimeSchedule + Send + Sync>) -> Self {
        Self {
            base: inner.base().clone(),
            inner,
        }
    }

    pub fn with_simple(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        Self::new(Box::new(SimpleSchedule::new(config, data)))
    }

    pub fn with_budget(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        Self::new(Box::new(BudgetSchedule::new(config, data)))
    }

    fn attach_dependencies(
        &self,
        graph: &ProjectGraph,
        job: &JobDefinition,
    ) -> Result<JobDefinition, ScheduleError> {
        let cut = job.cut();

        let mut inputs = Vec::new();
        for used in graph.get_cuts_directly_used_as_input(cut, true)? {
            if !graph.is_interface(&used)? {
                inputs.push(used);
            }
        }
        let mut ancestors = Vec::new();
        for parent in graph.get_all_cuts_parents(cut) {
            if !graph.is_interface(&parent)? {
                ancestors.push(parent);
            }
        }

        log_checks!(
            self.base.verbosity(),
            "{} depends on inputs {:?} and ancestors {:?}",
            cut,
            inputs,
            ancestors
        );
        Ok(job.with_added_dependencies(inputs, ancestors))
    }
}

impl OneTimeSchedule for SeedingSchedule {
    fn name(&self) -> &'static str {
        "Seeding"
    }

    fn base(&self) -> &ScheduleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScheduleBase {
        &mut self.base
    }

    fn candidate_cuts(&self) -> Vec<&ClassInfo> {
        self.inner.candidate_cuts()
    }

    fn create_schedule(&self) -> Vec<JobDefinition> {
        self.inner.create_schedule()
    }

    fn post_process(&self, jobs: Vec<JobDefinition>) -> Result<Vec<JobDefinition>, ScheduleError> {
        let jobs = self.inner.post_process(jobs)?;
        let graph = self.base.data().project_graph();

        let jobs = jobs
            .iter()
            .map(|job| self.attach_dependencies(graph, job))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sort_to_satisfy_dependencies(jobs, self.base.verbosity()))
    }
}

impl std::fmt::Debug for SeedingSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedingSchedule")
            .field("inner", &self.inner.name())
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ScheduleType;
    use super::*;
    use crate::facts::{ClassFacts, ClassKind};
    use std::collections::BTreeSet;

    /// `Car` takes an `Engine`, extends `Vehicle` and implements the
    /// `Driveable` interface, which carries default-method code.
    fn make_vehicles() -> Arc<ProjectStaticData> {
        make_data(vec![
            ClassFacts::concrete("s.Car", 6)
                .extends("s.Vehicle")
                .implements("s.Driveable")
                .with_parameter("s.Engine"),
            ClassFacts::concrete("s.Engine", 2),
            ClassFacts::new("s.Vehicle", ClassKind::Abstract, 1, true),
            ClassFacts::new("s.Driveable", ClassKind::Interface, 1, true),
        ])
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dependencies_attached_without_interfaces() {
        let mut schedule = SeedingSchedule::with_simple(make_config(10, 1, 1), make_vehicles());
        let jobs = schedule.create_new_schedule().unwrap();
        let car = jobs.iter().find(|j| j.cut() == "s.Car").unwrap();
        assert_eq!(car.input_dependencies(), &set(&["s.Engine"]));
        assert_eq!(car.ancestor_dependencies(), &set(&["s.Vehicle"]));
    }

    #[test]
    fn test_inputs_and_ancestors_run_first() {
        let mut schedule = SeedingSchedule::with_simple(make_config(10, 1, 1), make_vehicles());
        let jobs = schedule.create_new_schedule().unwrap();
        assert_eq!(
            cuts_of(&jobs),
            vec!["s.Engine", "s.Vehicle", "s.Car", "s.Driveable"]
        );
        // Budgets come from the Simple strategy unchanged
        assert_eq!(seconds_of(&jobs), vec![150, 150, 150, 150]);
    }

    #[test]
    fn test_budget_order_is_adjusted() {
        let mut schedule = SeedingSchedule::with_budget(make_config(10, 1, 1), make_vehicles());
        let jobs = schedule.create_new_schedule().unwrap();
        let position = |cut: &str| jobs.iter().position(|j| j.cut() == cut).unwrap();
        assert!(position("s.Engine") < position("s.Car"));
        assert!(position("s.Vehicle") < position("s.Car"));
        assert_eq!(jobs.len(), 4);
    }

    #[test]
    fn test_degraded_schedule_is_reordered() {
        // 2 minutes fit only Car and Engine; Vehicle is never scheduled
        let mut schedule = SeedingSchedule::with_simple(make_config(2, 1, 1), make_vehicles());
        let jobs = schedule.create_new_schedule().unwrap();
        assert_eq!(cuts_of(&jobs), vec!["s.Engine", "s.Car"]);
        assert_eq!(seconds_of(&jobs), vec![60, 60]);
    }

    #[test]
    fn test_runs_only_once() {
        let mut schedule = SeedingSchedule::with_simple(make_config(10, 1, 1), make_vehicles());
        assert!(schedule.create_new_schedule().is_ok());
        assert!(!schedule.can_execute_more());
        assert_eq!(
            schedule.create_new_schedule(),
            Err(ScheduleError::AlreadyExecuted)
        );
    }
}

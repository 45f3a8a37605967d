//! Even split of the budget.

use std::sync::Arc;

use crate::config::CtgConfig;
use crate::models::JobDefinition;
use crate::project::ProjectStaticData;

use super::{OneTimeSchedule, ScheduleBase};

/// Gives every testable CUT the same budget.
///
/// The CUT count is rounded up to a multiple of the core count, so every
/// wave of jobs occupies all cores.
#[derive(Clone, Debug)]
pub struct SimpleSchedule {
    base: ScheduleBase,
}

impl SimpleSchedule {
    pub fn new(config: CtgConfig, data: Arc<ProjectStaticData>) -> Self {
        Self {
            base: ScheduleBase::new(config, data),
        }
    }
}

impl OneTimeSchedule for SimpleSchedule {
    fn name(&self) -> &'static str {
        "Simple"
    }

    fn base(&self) -> &ScheduleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScheduleBase {
        &mut self.base
    }

    fn create_schedule(&self) -> Vec<JobDefinition> {
        let data = self.base.data();
        debug_assert!(self.base.enough_budget_for(data.total_number_of_testable_cuts()));

        let cuts = data.total_number_of_testable_cuts() as u64;
        if cuts == 0 {
            return Vec::new();
        }

        let cores = u64::from(self.base.config().number_of_usable_cores).max(1);
        let slots = cores * cuts.div_ceil(cores);
        let seconds = self.base.total_budget() / slots;

        data.testable_class_infos()
            .map(|info| JobDefinition::new(info.name(), seconds, self.base.memory_per_job()))
            .collect()
    }
}

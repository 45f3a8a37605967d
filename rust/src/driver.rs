//! Scheduler driver: picks a strategy from the configuration and runs it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use log::warn;
use thiserror::Error;

use crate::config::{ConfigError, CtgConfig, ScheduleKind};
use crate::models::JobDefinition;
use crate::project::{History, HistoryError, ProjectStaticData};
use crate::schedule::{
    BudgetSchedule, HistorySchedule, ScheduleError, ScheduleType, SeedingSchedule, SimpleSchedule,
};
use crate::{log_changes, log_checks};

/// Errors that can occur while setting up or running a schedule.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to load history: {0}")]
    History(#[from] HistoryError),
    #[error("Scheduling failed: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Owns the configuration and project data of one generation run.
pub struct JobScheduler {
    config: CtgConfig,
    data: Arc<ProjectStaticData>,
    schedule: Box<dyn ScheduleType + Send + Sync>,
}

impl JobScheduler {
    pub fn new(config: CtgConfig, mut data: ProjectStaticData) -> Result<Self, SchedulerError> {
        config.validate()?;

        if config.schedule_kind == ScheduleKind::History {
            if let Some(history) = load_history(&config)? {
                data.apply_history(history);
            }
        }

        let data = Arc::new(data);
        log_changes!(
            config.verbosity,
            "Scheduling {} of {} classes with {} on {} cores for {} minutes",
            data.total_number_of_testable_cuts(),
            data.total_number_of_classes(),
            config.schedule_kind,
            config.number_of_usable_cores,
            config.time_in_minutes
        );

        let schedule: Box<dyn ScheduleType + Send + Sync> = match config.schedule_kind {
            ScheduleKind::Simple => Box::new(SimpleSchedule::new(config.clone(), Arc::clone(&data))),
            ScheduleKind::Budget => Box::new(BudgetSchedule::new(config.clone(), Arc::clone(&data))),
            ScheduleKind::History => {
                Box::new(HistorySchedule::new(config.clone(), Arc::clone(&data)))
            }
            ScheduleKind::Seeding => Box::new(SeedingSchedule::with_simple(
                config.clone(),
                Arc::clone(&data),
            )),
            ScheduleKind::BudgetAndSeeding => Box::new(SeedingSchedule::with_budget(
                config.clone(),
                Arc::clone(&data),
            )),
        };

        Ok(Self {
            config,
            data,
            schedule,
        })
    }

    pub fn config(&self) -> &CtgConfig {
        &self.config
    }

    pub fn data(&self) -> &ProjectStaticData {
        &self.data
    }

    pub fn create_new_schedule(&mut self) -> Result<Vec<JobDefinition>, SchedulerError> {
        Ok(self.schedule.create_new_schedule()?)
    }

    pub fn can_execute_more(&self) -> bool {
        self.schedule.can_execute_more()
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("config", &self.config)
            .field("data", &self.data)
            .finish()
    }
}

fn load_history(config: &CtgConfig) -> Result<Option<History>, HistoryError> {
    let Some(log_path) = config.history_file.as_deref() else {
        warn!("History schedule selected but no history file configured");
        return Ok(None);
    };
    let Some(history) = History::load_log(log_path)? else {
        return Ok(None);
    };

    match config.coverage_history_file.as_deref() {
        Some(coverage_path) => {
            let coverage = History::load_coverage(coverage_path)?;
            log_checks!(
                config.verbosity,
                "Loaded coverage history for {} classes",
                coverage.len()
            );
            Ok(Some(history.with_coverage(coverage)))
        }
        None => Ok(Some(history)),
    }
}

/// Aggregate figures of a schedule, as seen by an executor with `cores` workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub number_of_jobs: usize,
    pub total_seconds: u64,
    /// Finish time of the last job when each job goes to the first free worker
    pub makespan_seconds: u64,
}

impl ScheduleSummary {
    pub fn from_jobs(jobs: &[JobDefinition], cores: u32) -> Self {
        let mut workers: BinaryHeap<Reverse<u64>> =
            (0..cores.max(1)).map(|_| Reverse(0)).collect();
        let mut makespan = 0;

        for job in jobs {
            let Some(Reverse(free_at)) = workers.pop() else {
                break;
            };
            let finish = free_at + job.seconds();
            makespan = makespan.max(finish);
            workers.push(Reverse(finish));
        }

        Self {
            number_of_jobs: jobs.len(),
            total_seconds: jobs.iter().map(JobDefinition::seconds).sum(),
            makespan_seconds: makespan,
        }
    }

    /// When the last job is expected to finish if the run starts at `start`.
    pub fn expected_end(&self, start: NaiveDateTime) -> NaiveDateTime {
        let seconds = i64::try_from(self.makespan_seconds).unwrap_or(i64::MAX);
        start + Duration::seconds(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{ClassFactProvider, ClassFacts, InMemoryFacts};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::PathBuf;

    fn make_data() -> ProjectStaticData {
        let facts: Arc<dyn ClassFactProvider> = Arc::new(InMemoryFacts::new([
            ClassFacts::concrete("d.Small", 2),
            ClassFacts::concrete("d.Large", 20).with_parameter("d.Small"),
            ClassFacts::concrete("d.Medium", 8),
        ]));
        ProjectStaticData::analyze(facts, 0)
    }

    fn make_config(kind: ScheduleKind) -> CtgConfig {
        CtgConfig {
            time_in_minutes: 10,
            number_of_usable_cores: 2,
            schedule_kind: kind,
            ..CtgConfig::default()
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ctg-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CtgConfig {
            number_of_usable_cores: 0,
            ..CtgConfig::default()
        };
        let err = JobScheduler::new(config, make_data()).unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)));
    }

    #[test]
    fn test_simple_kind() {
        let mut scheduler = JobScheduler::new(make_config(ScheduleKind::Simple), make_data()).unwrap();
        let jobs = scheduler.create_new_schedule().unwrap();
        // 3 CUTs on 2 cores -> 4 slots over 1200 s
        assert!(jobs.iter().all(|j| j.seconds() == 300));
        assert!(!scheduler.can_execute_more());
    }

    #[test]
    fn test_budget_and_seeding_orders_inputs_first() {
        let mut scheduler =
            JobScheduler::new(make_config(ScheduleKind::BudgetAndSeeding), make_data()).unwrap();
        let jobs = scheduler.create_new_schedule().unwrap();
        let cuts: Vec<&str> = jobs.iter().map(JobDefinition::cut).collect();
        // Budget order would be Large, Medium, Small; Large waits for Small
        assert_eq!(cuts, vec!["d.Medium", "d.Small", "d.Large"]);
    }

    #[test]
    fn test_second_schedule_is_an_error() {
        let mut scheduler = JobScheduler::new(make_config(ScheduleKind::Budget), make_data()).unwrap();
        scheduler.create_new_schedule().unwrap();
        let err = scheduler.create_new_schedule().unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Schedule(ScheduleError::AlreadyExecuted)
        ));
    }

    #[test]
    fn test_missing_history_file_means_no_history() {
        let config = CtgConfig {
            history_file: Some(PathBuf::from("/nonexistent/ctg/history.log")),
            ..make_config(ScheduleKind::History)
        };
        let scheduler = JobScheduler::new(config, make_data()).unwrap();
        assert!(!scheduler.data().has_history());
    }

    #[test]
    fn test_history_files_are_applied() {
        let log = temp_file("history.log", "M\tsrc/main/java/d/Medium.java\n");
        let coverage = temp_file("coverage.txt", "d.Small\t0.5\t0.5\t0.5\n");
        let config = CtgConfig {
            history_file: Some(log.clone()),
            coverage_history_file: Some(coverage.clone()),
            ..make_config(ScheduleKind::History)
        };

        let mut scheduler = JobScheduler::new(config, make_data()).unwrap();
        let data = scheduler.data();
        assert!(data.has_history());
        assert!(data.class_info("d.Medium").unwrap().has_changed());
        assert!(!data.class_info("d.Small").unwrap().has_coverage_improved());

        let jobs = scheduler.create_new_schedule().unwrap();
        assert!(jobs.iter().all(|j| j.cut() != "d.Small"));

        fs::remove_file(log).unwrap();
        fs::remove_file(coverage).unwrap();
    }

    #[test]
    fn test_history_files_ignored_for_other_kinds() {
        let config = CtgConfig {
            history_file: Some(PathBuf::from("/nonexistent/ctg/history.log")),
            ..make_config(ScheduleKind::Budget)
        };
        let scheduler = JobScheduler::new(config, make_data()).unwrap();
        assert!(!scheduler.data().has_history());
    }

    #[test]
    fn test_summary_makespan_list_scheduling() {
        let jobs = vec![
            JobDefinition::new("a", 600, 1),
            JobDefinition::new("b", 300, 1),
            JobDefinition::new("c", 200, 1),
            JobDefinition::new("d", 200, 1),
        ];
        // worker 1: a (600); worker 2: b, c (500), then d goes to worker 2
        let summary = ScheduleSummary::from_jobs(&jobs, 2);
        assert_eq!(summary.number_of_jobs, 4);
        assert_eq!(summary.total_seconds, 1300);
        assert_eq!(summary.makespan_seconds, 700);
    }

    #[test]
    fn test_summary_expected_end() {
        let summary = ScheduleSummary::from_jobs(&[JobDefinition::new("a", 3660, 1)], 4);
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(0, 31, 0)
            .unwrap();
        assert_eq!(summary.expected_end(start), end);
    }

    #[test]
    fn test_summary_of_empty_schedule() {
        let summary = ScheduleSummary::from_jobs(&[], 3);
        assert_eq!(summary.makespan_seconds, 0);
        assert_eq!(summary.total_seconds, 0);
    }
}

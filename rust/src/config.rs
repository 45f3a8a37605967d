//! Configuration types for the CTG scheduler.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while validating a scheduler configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: u64 },
    #[error("Minimum of {min_minutes} minutes per job exceeds the {time_minutes} minutes available per core")]
    MinimumExceedsBudget { min_minutes: u32, time_minutes: u32 },
    #[error("Unknown schedule kind: {0}")]
    UnknownScheduleKind(String),
}

/// Which budgeting/ordering strategy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    /// Even split of the budget.
    Simple,
    /// Budget proportional to branch count.
    Budget,
    /// Budget adapted to change and coverage history.
    History,
    /// Simple budgets, reordered to satisfy seeding dependencies.
    Seeding,
    /// Branch-proportional budgets, reordered to satisfy seeding dependencies.
    BudgetAndSeeding,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Budget => "BUDGET",
            Self::History => "HISTORY",
            Self::Seeding => "SEEDING",
            Self::BudgetAndSeeding => "BUDGET_AND_SEEDING",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(Self::Simple),
            "BUDGET" => Ok(Self::Budget),
            "HISTORY" => Ok(Self::History),
            "SEEDING" => Ok(Self::Seeding),
            "BUDGET_AND_SEEDING" => Ok(Self::BudgetAndSeeding),
            _ => Err(ConfigError::UnknownScheduleKind(s.to_string())),
        }
    }
}

/// Configuration for one scheduling run.
#[derive(Clone, Debug)]
pub struct CtgConfig {
    /// Wall-clock budget per core, in minutes
    pub time_in_minutes: u32,
    /// Number of cores the executor may use in parallel
    pub number_of_usable_cores: u32,
    /// Floor for the budget of a single job, in minutes
    pub min_minutes_per_job: u32,
    /// Memory handed to every job, in MB
    pub constant_memory_per_job: u32,
    /// Strategy used to build the schedule
    pub schedule_kind: ScheduleKind,
    /// Change log of the previous run (`A|M|D<TAB>path` lines)
    pub history_file: Option<PathBuf>,
    /// Per-class coverage series of previous runs (`class<TAB>v1<TAB>v2...`)
    pub coverage_history_file: Option<PathBuf>,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for CtgConfig {
    fn default() -> Self {
        Self {
            time_in_minutes: 2,
            number_of_usable_cores: 1,
            min_minutes_per_job: 1,
            constant_memory_per_job: 1000,
            schedule_kind: ScheduleKind::BudgetAndSeeding,
            history_file: None,
            coverage_history_file: None,
            verbosity: 0,
        }
    }
}

impl CtgConfig {
    /// Reject configurations that cannot produce a meaningful schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("time_in_minutes", self.time_in_minutes),
            ("number_of_usable_cores", self.number_of_usable_cores),
            ("min_minutes_per_job", self.min_minutes_per_job),
            ("constant_memory_per_job", self.constant_memory_per_job),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    value: u64::from(value),
                });
            }
        }
        if self.min_minutes_per_job > self.time_in_minutes {
            return Err(ConfigError::MinimumExceedsBudget {
                min_minutes: self.min_minutes_per_job,
                time_minutes: self.time_in_minutes,
            });
        }
        Ok(())
    }

    /// Budget of the whole run across all cores, in seconds.
    pub fn total_budget_seconds(&self) -> u64 {
        60 * u64::from(self.time_in_minutes) * u64::from(self.number_of_usable_cores)
    }

    /// Largest budget a single job may get: one core for the whole run.
    pub fn maximum_budget_per_core(&self) -> u64 {
        60 * u64::from(self.time_in_minutes)
    }

    pub fn min_seconds_per_job(&self) -> u64 {
        60 * u64::from(self.min_minutes_per_job)
    }
}

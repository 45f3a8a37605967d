//! Best-effort ordering of jobs so dependencies run first.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::log_debug;
use crate::models::JobDefinition;

/// Reorder `jobs` so that, where possible, every job comes after the CUTs it
/// depends on. Unconstrained jobs keep their relative order.
///
/// Jobs whose dependencies are not yet placed are postponed, and postponed
/// jobs are reconsidered first on every step. When nothing is placeable
/// (a dependency cycle, or a dependency that is not in the list), the oldest
/// postponed job is placed anyway, so the result is always a permutation
/// of the input.
pub fn sort_to_satisfy_dependencies(jobs: Vec<JobDefinition>, verbosity: u8) -> Vec<JobDefinition> {
    let mut out: Vec<JobDefinition> = Vec::with_capacity(jobs.len());
    let mut to_assign: VecDeque<JobDefinition> = jobs.into();
    let mut postponed: Vec<JobDefinition> = Vec::new();
    let mut assigned: FxHashSet<String> = FxHashSet::default();

    while !to_assign.is_empty() || !postponed.is_empty() {
        let mut selected = postponed
            .iter()
            .position(|job| job.are_dependencies_satisfied(&assigned))
            .map(|pos| postponed.remove(pos));

        if selected.is_none() && to_assign.is_empty() {
            // Loop condition guarantees postponed is not empty here
            let oldest = postponed.remove(0);
            log_debug!(
                verbosity,
                "Placing {} with unsatisfied dependencies",
                oldest.cut()
            );
            selected = Some(oldest);
        }

        while selected.is_none() {
            let Some(job) = to_assign.pop_front() else {
                break;
            };
            if job.are_dependencies_satisfied(&assigned) {
                selected = Some(job);
            } else {
                log_debug!(verbosity, "Postponing {}", job.cut());
                postponed.push(job);
            }
        }

        if let Some(job) = selected {
            assigned.insert(job.cut().to_string());
            out.push(job);
        }
    }

    out
}

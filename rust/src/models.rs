//! Core data types for the CTG scheduler.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashSet;

/// Static metadata about one class of the scanned project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    name: String,
    number_of_branches: u32,
    has_code: bool,
    has_changed: bool,
    has_coverage_improved: bool,
}

impl ClassInfo {
    /// Create a record with both history flags at their default (`true`).
    pub fn new(name: impl Into<String>, number_of_branches: u32, has_code: bool) -> Self {
        Self {
            name: name.into(),
            number_of_branches,
            has_code,
            has_changed: true,
            has_coverage_improved: true,
        }
    }

    /// Fully qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number_of_branches(&self) -> u32 {
        self.number_of_branches
    }

    /// A class is a CUT only if it has at least one branch or branchless executable method.
    pub fn is_testable(&self) -> bool {
        self.has_code
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    pub fn has_coverage_improved(&self) -> bool {
        self.has_coverage_improved
    }

    pub(crate) fn set_history_flags(&mut self, has_changed: bool, has_coverage_improved: bool) {
        self.has_changed = has_changed;
        self.has_coverage_improved = has_coverage_improved;
    }
}

/// One unit of work for the executor: generate tests for `cut` within `seconds`.
///
/// Equality and hashing only look at the CUT name.
#[derive(Clone, Debug)]
pub struct JobDefinition {
    cut: String,
    seconds: u64,
    memory_mb: u32,
    input_dependencies: BTreeSet<String>,
    ancestor_dependencies: BTreeSet<String>,
}

impl JobDefinition {
    pub fn new(cut: impl Into<String>, seconds: u64, memory_mb: u32) -> Self {
        Self {
            cut: cut.into(),
            seconds,
            memory_mb,
            input_dependencies: BTreeSet::new(),
            ancestor_dependencies: BTreeSet::new(),
        }
    }

    pub fn cut(&self) -> &str {
        &self.cut
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    /// CUTs whose instances this CUT's public surface consumes.
    pub fn input_dependencies(&self) -> &BTreeSet<String> {
        &self.input_dependencies
    }

    /// Non-interface CUT ancestors of this CUT.
    pub fn ancestor_dependencies(&self) -> &BTreeSet<String> {
        &self.ancestor_dependencies
    }

    /// Copy of this job with `extra` seconds added to its budget.
    pub fn with_added_budget(&self, extra: u64) -> Self {
        Self {
            seconds: self.seconds + extra,
            ..self.clone()
        }
    }

    /// Copy of this job with the given dependency names merged in.
    pub fn with_added_dependencies<I, A>(&self, inputs: I, ancestors: A) -> Self
    where
        I: IntoIterator<Item = String>,
        A: IntoIterator<Item = String>,
    {
        let mut job = self.clone();
        job.input_dependencies.extend(inputs);
        job.ancestor_dependencies.extend(ancestors);
        job
    }

    /// Every CUT this job would like to see scheduled before itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.input_dependencies
            .union(&self.ancestor_dependencies)
            .map(String::as_str)
    }

    pub fn are_dependencies_satisfied(&self, assigned: &FxHashSet<String>) -> bool {
        self.dependencies().all(|dep| assigned.contains(dep))
    }
}

impl PartialEq for JobDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.cut == other.cut
    }
}

impl Eq for JobDefinition {}

impl Hash for JobDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cut.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_info_defaults_history_flags() {
        let info = ClassInfo::new("org.example.Foo", 12, true);
        assert!(info.has_changed());
        assert!(info.has_coverage_improved());
        assert!(info.is_testable());
        assert_eq!(info.number_of_branches(), 12);
    }

    #[test]
    fn test_added_budget_leaves_original_untouched() {
        let job = JobDefinition::new("a.A", 100, 512);
        let bigger = job.with_added_budget(20);
        assert_eq!(job.seconds(), 100);
        assert_eq!(bigger.seconds(), 120);
        assert_eq!(bigger.memory_mb(), 512);
    }

    #[test]
    fn test_dependencies_union_inputs_and_ancestors() {
        let job = JobDefinition::new("a.A", 60, 512).with_added_dependencies(
            ["a.B".to_string(), "a.C".to_string()],
            ["a.C".to_string(), "a.Base".to_string()],
        );
        let deps: Vec<&str> = job.dependencies().collect();
        assert_eq!(deps, vec!["a.B", "a.Base", "a.C"]);
    }

    #[test]
    fn test_dependencies_satisfied() {
        let job = JobDefinition::new("a.A", 60, 512)
            .with_added_dependencies(["a.B".to_string()], Vec::<String>::new());
        let mut assigned = FxHashSet::default();
        assert!(!job.are_dependencies_satisfied(&assigned));
        assigned.insert("a.B".to_string());
        assert!(job.are_dependencies_satisfied(&assigned));
    }

    #[test]
    fn test_equality_by_cut_name() {
        let a = JobDefinition::new("a.A", 60, 512);
        let b = JobDefinition::new("a.A", 600, 2048);
        assert_eq!(a, b);
        assert_ne!(a, JobDefinition::new("a.B", 60, 512));
    }
}

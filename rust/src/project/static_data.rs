//! Per-class static metadata of the project under test.

use std::sync::{Arc, OnceLock};

use log::warn;
use rustc_hash::FxHashMap;

use crate::facts::ClassFactProvider;
use crate::log_checks;
use crate::models::ClassInfo;

use super::graph::ProjectGraph;
use super::history::History;

/// Table of [`ClassInfo`] records plus optional history of previous runs.
///
/// Records keep discovery order. The [`ProjectGraph`] is built on first
/// access and cached for the lifetime of the data.
pub struct ProjectStaticData {
    classes: Vec<ClassInfo>,
    index: FxHashMap<String, usize>,
    history: Option<History>,
    facts: Arc<dyn ClassFactProvider>,
    graph: OnceLock<ProjectGraph>,
    verbosity: u8,
}

impl ProjectStaticData {
    /// Query the provider for every known class.
    ///
    /// A class whose facts cannot be obtained is logged and left out; the
    /// remaining classes are still analyzed.
    pub fn analyze(facts: Arc<dyn ClassFactProvider>, verbosity: u8) -> Self {
        let mut infos = Vec::new();

        for name in facts.known_classes() {
            let info = facts.branch_count(&name).and_then(|branches| {
                let testable = facts.is_testable(&name)?;
                Ok(ClassInfo::new(name.clone(), branches, testable))
            });
            match info {
                Ok(info) => {
                    log_checks!(
                        verbosity,
                        "Analyzed {}: {} branches, testable={}",
                        name,
                        info.number_of_branches(),
                        info.is_testable()
                    );
                    infos.push(info);
                }
                Err(e) => warn!("Skipping class {}: {}", name, e),
            }
        }

        Self::from_class_infos(infos, facts, verbosity)
    }

    /// Wrap already computed records. Later duplicates of a name replace earlier ones.
    pub fn from_class_infos(
        infos: impl IntoIterator<Item = ClassInfo>,
        facts: Arc<dyn ClassFactProvider>,
        verbosity: u8,
    ) -> Self {
        let mut classes: Vec<ClassInfo> = Vec::new();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        for info in infos {
            match index.get(info.name()) {
                Some(&pos) => classes[pos] = info,
                None => {
                    index.insert(info.name().to_string(), classes.len());
                    classes.push(info);
                }
            }
        }

        Self {
            classes,
            index,
            history: None,
            facts,
            graph: OnceLock::new(),
            verbosity,
        }
    }

    /// Set the change/coverage flags of every class from `history`.
    ///
    /// Must happen before scheduling; the flags are not touched afterwards.
    pub fn apply_history(&mut self, history: History) {
        for info in &mut self.classes {
            let changed = history.is_class_modified(info.name());
            let improved = history.has_coverage_improved(info.name());
            info.set_history_flags(changed, improved);
        }
        self.history = Some(history);
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    pub fn class_info(&self, name: &str) -> Option<&ClassInfo> {
        self.index.get(name).map(|&pos| &self.classes[pos])
    }

    /// All classes, in discovery order.
    pub fn class_infos(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    /// Testable CUTs, in discovery order.
    pub fn testable_class_infos(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter().filter(|c| c.is_testable())
    }

    pub fn total_number_of_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn total_number_of_testable_cuts(&self) -> usize {
        self.testable_class_infos().count()
    }

    /// Sum of branches over testable CUTs.
    pub fn total_number_of_branches(&self) -> u64 {
        self.testable_class_infos()
            .map(|c| u64::from(c.number_of_branches()))
            .sum()
    }

    /// The project graph, built at most once even under concurrent first access.
    pub fn project_graph(&self) -> &ProjectGraph {
        self.graph.get_or_init(|| {
            let classes = self.classes.iter().map(|c| c.name().to_string()).collect();
            let cuts = self
                .testable_class_infos()
                .map(|c| c.name().to_string())
                .collect();
            ProjectGraph::new(Arc::clone(&self.facts), classes, cuts, self.verbosity)
        })
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }
}

impl std::fmt::Debug for ProjectStaticData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStaticData")
            .field("classes", &self.classes)
            .field("history", &self.history)
            .field("graph_built", &self.graph.get().is_some())
            .finish()
    }
}

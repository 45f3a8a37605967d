//! Structural queries over the classes of a project.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::facts::{ClassFactProvider, ClassKind};
use crate::log_debug;

use super::inheritance::InheritanceTree;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("Class is not a testable CUT: {0}")]
    NotACut(String),
}

/// Read-only view over the project's inheritance and usage relations.
///
/// Every returned set only contains testable CUTs. Non-CUT classes still take
/// part in the transitive walks.
pub struct ProjectGraph {
    facts: Arc<dyn ClassFactProvider>,
    inheritance: InheritanceTree,
    /// Classes whose analysis succeeded
    classes: FxHashSet<String>,
    /// Testable CUTs, in discovery order
    cuts: Vec<String>,
    cut_set: FxHashSet<String>,
    /// class -> classes it casts references to
    cast_cache: Mutex<FxHashMap<String, Arc<Vec<String>>>>,
    verbosity: u8,
}

impl ProjectGraph {
    /// Build the graph from the analyzed classes and the subset that are CUTs.
    ///
    /// Classes the provider knows but that are not in `classes` are treated
    /// as unknown, and their own inheritance edges are ignored.
    pub fn new(
        facts: Arc<dyn ClassFactProvider>,
        classes: Vec<String>,
        cuts: Vec<String>,
        verbosity: u8,
    ) -> Self {
        let classes: FxHashSet<String> = classes.into_iter().collect();
        let edges: Vec<_> = facts
            .inheritance_edges()
            .into_iter()
            .filter(|edge| classes.contains(&edge.child))
            .collect();
        let inheritance = InheritanceTree::build(classes.iter().map(String::as_str), &edges);
        let cut_set = cuts.iter().cloned().collect();

        Self {
            facts,
            inheritance,
            classes,
            cuts,
            cut_set,
            cast_cache: Mutex::new(FxHashMap::default()),
            verbosity,
        }
    }

    pub fn is_cut(&self, class: &str) -> bool {
        self.cut_set.contains(class)
    }

    fn kind(&self, class: &str) -> Result<ClassKind, GraphError> {
        if !self.classes.contains(class) {
            return Err(GraphError::UnknownClass(class.to_string()));
        }
        self.facts
            .class_kind(class)
            .ok_or_else(|| GraphError::UnknownClass(class.to_string()))
    }

    pub fn is_interface(&self, class: &str) -> Result<bool, GraphError> {
        Ok(self.kind(class)? == ClassKind::Interface)
    }

    pub fn is_abstract(&self, class: &str) -> Result<bool, GraphError> {
        Ok(self.kind(class)? == ClassKind::Abstract)
    }

    pub fn is_concrete(&self, class: &str) -> Result<bool, GraphError> {
        Ok(self.kind(class)? == ClassKind::Concrete)
    }

    fn check_cut(&self, class: &str) -> Result<(), GraphError> {
        if self.is_cut(class) {
            Ok(())
        } else if !self.classes.contains(class) {
            Err(GraphError::UnknownClass(class.to_string()))
        } else {
            Err(GraphError::NotACut(class.to_string()))
        }
    }

    /// All CUT ancestors of `class`, transitively, excluding `class`.
    ///
    /// An inconsistent inheritance tree is logged and yields an empty set.
    pub fn get_all_cuts_parents(&self, class: &str) -> BTreeSet<String> {
        match self.inheritance.ancestors(class) {
            Ok(ancestors) => self.only_cuts(ancestors),
            Err(e) => {
                warn!("Cannot compute parents of {}: {}", class, e);
                BTreeSet::new()
            }
        }
    }

    /// All CUT descendants of `class`, transitively, excluding `class`.
    pub fn get_all_cuts_subclasses(&self, class: &str) -> BTreeSet<String> {
        match self.inheritance.descendants(class) {
            Ok(descendants) => self.only_cuts(descendants),
            Err(e) => {
                warn!("Cannot compute subclasses of {}: {}", class, e);
                BTreeSet::new()
            }
        }
    }

    fn only_cuts(&self, classes: FxHashSet<String>) -> BTreeSet<String> {
        classes.into_iter().filter(|c| self.is_cut(c)).collect()
    }

    /// CUTs that `class` takes as public parameter/field type or casts to.
    ///
    /// With `include_subclasses`, CUT subclasses of every used type are
    /// added too, as instances of a subclass can be passed in its place.
    pub fn get_cuts_directly_used_as_input(
        &self,
        class: &str,
        include_subclasses: bool,
    ) -> Result<BTreeSet<String>, GraphError> {
        self.check_cut(class)?;
        Ok(self.used_as_input(class, include_subclasses))
    }

    /// CUTs that take `class` as input.
    ///
    /// With `include_superclasses`, CUTs that take any CUT ancestor of
    /// `class` as input are included as well.
    pub fn get_cuts_that_use_this_cut_as_input(
        &self,
        class: &str,
        include_superclasses: bool,
    ) -> Result<BTreeSet<String>, GraphError> {
        self.check_cut(class)?;

        let mut users = self.users_of(class);
        if include_superclasses {
            for parent in self.get_all_cuts_parents(class) {
                users.extend(self.users_of(&parent));
            }
        }
        users.remove(class);
        Ok(users)
    }

    fn users_of(&self, class: &str) -> BTreeSet<String> {
        self.cuts
            .iter()
            .filter(|other| other.as_str() != class)
            .filter(|other| self.used_as_input(other, false).contains(class))
            .cloned()
            .collect()
    }

    fn used_as_input(&self, class: &str, include_subclasses: bool) -> BTreeSet<String> {
        let mut referenced: Vec<String> = self.facts.public_input_types(class);
        referenced.extend(self.cast_classes(class).iter().cloned());

        let mut result: BTreeSet<String> = BTreeSet::new();
        for used in &referenced {
            if self.is_cut(used) {
                result.insert(used.clone());
            }
            if include_subclasses && self.inheritance.contains(used) {
                result.extend(self.get_all_cuts_subclasses(used));
            }
        }
        result.remove(class);

        log_debug!(self.verbosity, "{} uses as input: {:?}", class, result);
        result
    }

    /// Memoized cast analysis, computed at most once per class.
    fn cast_classes(&self, class: &str) -> Arc<Vec<String>> {
        if let Some(cached) = self
            .cast_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(class)
        {
            return Arc::clone(cached);
        }

        // Computed without holding the lock; a concurrent miss computes the same value
        let computed = Arc::new(self.facts.cast_types(class));
        let mut cache = self
            .cast_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(class.to_string()).or_insert(computed))
    }
}

impl std::fmt::Debug for ProjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectGraph")
            .field("cuts", &self.cuts.len())
            .field("inheritance", &self.inheritance)
            .finish()
    }
}

//! Parent/child relation over every known class.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::facts::InheritanceEdge;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InheritanceError {
    #[error("Class is not part of the inheritance tree: {0}")]
    UnknownClass(String),
}

/// Extends/implements relation, including classes that are not CUTs.
#[derive(Debug, Clone, Default)]
pub struct InheritanceTree {
    parents: FxHashMap<String, FxHashSet<String>>,
    children: FxHashMap<String, FxHashSet<String>>,
}

impl InheritanceTree {
    /// Build the tree from the known classes and their edges.
    ///
    /// Parents that only show up in an edge (e.g. library supertypes) still
    /// become nodes so transitive queries can walk through them.
    pub fn build<'a>(
        classes: impl IntoIterator<Item = &'a str>,
        edges: &[InheritanceEdge],
    ) -> Self {
        let mut tree = Self::default();
        for class in classes {
            tree.add_node(class);
        }
        for edge in edges {
            tree.add_node(&edge.child);
            tree.add_node(&edge.parent);
            if edge.child == edge.parent {
                continue;
            }
            if let Some(parents) = tree.parents.get_mut(&edge.child) {
                parents.insert(edge.parent.clone());
            }
            if let Some(children) = tree.children.get_mut(&edge.parent) {
                children.insert(edge.child.clone());
            }
        }
        tree
    }

    fn add_node(&mut self, class: &str) {
        if !self.parents.contains_key(class) {
            self.parents.insert(class.to_string(), FxHashSet::default());
            self.children.insert(class.to_string(), FxHashSet::default());
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.parents.contains_key(class)
    }

    /// All transitive ancestors of `class`, excluding `class` itself.
    pub fn ancestors(&self, class: &str) -> Result<FxHashSet<String>, InheritanceError> {
        Self::closure(&self.parents, class)
    }

    /// All transitive descendants of `class`, excluding `class` itself.
    pub fn descendants(&self, class: &str) -> Result<FxHashSet<String>, InheritanceError> {
        Self::closure(&self.children, class)
    }

    // Breadth-first walk with a visited set, so cyclic input cannot loop.
    fn closure(
        relation: &FxHashMap<String, FxHashSet<String>>,
        class: &str,
    ) -> Result<FxHashSet<String>, InheritanceError> {
        if !relation.contains_key(class) {
            return Err(InheritanceError::UnknownClass(class.to_string()));
        }

        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::from([class]);

        while let Some(current) = queue.pop_front() {
            let Some(next) = relation.get(current) else {
                continue;
            };
            for other in next {
                if other != class && visited.insert(other.clone()) {
                    queue.push_back(other.as_str());
                }
            }
        }

        Ok(visited)
    }
}

//! Structural facts about the classes of a project.
//!
//! The scheduler never parses bytecode itself. It consumes a
//! [`ClassFactProvider`], which any analyzer (bytecode parser, external
//! analysis service, precomputed dump) can implement.

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors reported by a fact provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactError {
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("Failed to analyze {class}: {reason}")]
    AnalysisFailed { class: String, reason: String },
}

/// Structural kind of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Interface,
    Abstract,
    Concrete,
}

/// `child` extends or implements `parent`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InheritanceEdge {
    pub child: String,
    pub parent: String,
}

impl InheritanceEdge {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

/// Source of per-class structural facts.
pub trait ClassFactProvider: Send + Sync {
    /// Every class the analyzer observed, in discovery order.
    fn known_classes(&self) -> Vec<String>;

    fn branch_count(&self, class: &str) -> Result<u32, FactError>;

    /// Whether the class has at least one branch or branchless executable method.
    fn is_testable(&self, class: &str) -> Result<bool, FactError>;

    /// `None` if the class was never observed.
    fn class_kind(&self, class: &str) -> Option<ClassKind>;

    /// Extends/implements relation over all known classes.
    fn inheritance_edges(&self) -> Vec<InheritanceEdge>;

    /// Parameter types of public constructors and methods, plus public field types.
    fn public_input_types(&self, class: &str) -> Vec<String>;

    /// Types a reference is cast to inside the class's code.
    ///
    /// Requires a scan of the class body, so callers memoize the result.
    fn cast_types(&self, class: &str) -> Vec<String>;
}

/// Everything known about a single class, as fed to [`InMemoryFacts`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClassFacts {
    pub name: String,
    pub kind: ClassKind,
    pub branches: u32,
    pub has_code: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub parameter_types: Vec<String>,
    pub field_types: Vec<String>,
    pub cast_types: Vec<String>,
    /// Set when the upstream analyzer could not load or instrument the class
    pub load_error: Option<String>,
}

impl ClassFacts {
    pub fn new(name: impl Into<String>, kind: ClassKind, branches: u32, has_code: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            branches,
            has_code,
            superclass: None,
            interfaces: Vec::new(),
            parameter_types: Vec::new(),
            field_types: Vec::new(),
            cast_types: Vec::new(),
            load_error: None,
        }
    }

    pub fn concrete(name: impl Into<String>, branches: u32) -> Self {
        Self::new(name, ClassKind::Concrete, branches, true)
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_parameter(mut self, type_name: impl Into<String>) -> Self {
        self.parameter_types.push(type_name.into());
        self
    }

    pub fn with_field(mut self, type_name: impl Into<String>) -> Self {
        self.field_types.push(type_name.into());
        self
    }

    pub fn with_cast(mut self, type_name: impl Into<String>) -> Self {
        self.cast_types.push(type_name.into());
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.load_error = Some(reason.into());
        self
    }
}

/// Fact provider over a precomputed list of [`ClassFacts`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryFacts {
    order: Vec<String>,
    classes: FxHashMap<String, ClassFacts>,
}

impl InMemoryFacts {
    pub fn new(facts: impl IntoIterator<Item = ClassFacts>) -> Self {
        let mut provider = Self::default();
        for class in facts {
            provider.insert(class);
        }
        provider
    }

    /// Add or replace a class. Replacing keeps the original discovery position.
    pub fn insert(&mut self, facts: ClassFacts) {
        if !self.classes.contains_key(&facts.name) {
            self.order.push(facts.name.clone());
        }
        self.classes.insert(facts.name.clone(), facts);
    }

    fn get(&self, class: &str) -> Result<&ClassFacts, FactError> {
        let facts = self
            .classes
            .get(class)
            .ok_or_else(|| FactError::UnknownClass(class.to_string()))?;
        match &facts.load_error {
            Some(reason) => Err(FactError::AnalysisFailed {
                class: class.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(facts),
        }
    }
}

impl ClassFactProvider for InMemoryFacts {
    fn known_classes(&self) -> Vec<String> {
        self.order.clone()
    }

    fn branch_count(&self, class: &str) -> Result<u32, FactError> {
        Ok(self.get(class)?.branches)
    }

    fn is_testable(&self, class: &str) -> Result<bool, FactError> {
        Ok(self.get(class)?.has_code)
    }

    fn class_kind(&self, class: &str) -> Option<ClassKind> {
        self.classes.get(class).map(|c| c.kind)
    }

    fn inheritance_edges(&self) -> Vec<InheritanceEdge> {
        self.order
            .iter()
            .filter_map(|name| self.classes.get(name))
            .flat_map(|c| {
                c.superclass
                    .iter()
                    .chain(c.interfaces.iter())
                    .map(move |parent| InheritanceEdge::new(c.name.clone(), parent.clone()))
            })
            .collect()
    }

    fn public_input_types(&self, class: &str) -> Vec<String> {
        self.classes
            .get(class)
            .map(|c| {
                c.parameter_types
                    .iter()
                    .chain(c.field_types.iter())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cast_types(&self, class: &str) -> Vec<String> {
        self.classes
            .get(class)
            .map(|c| c.cast_types.clone())
            .unwrap_or_default()
    }
}

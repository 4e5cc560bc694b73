//! Numbering, environments, cross-references and citations.
//!
//! These run as hooks of the generic parser and share the [`Registry`] of
//! identifiers built up while the block tree is produced.

pub mod citations;
pub mod environments;
pub mod finalize;
pub mod numbering;
pub mod references;

pub use citations::{clean_field, Citations};
pub use environments::{EnvironmentMarker, EnvironmentMatcher, EnvironmentTracker};
pub use numbering::{HeaderNumberer, TheoremCounters};
pub use references::resolve_cross_reference;

use crate::lexical::Category;
use std::collections::HashMap;

/// What an identifier points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub category: Category,
    /// `"2.1"` for sections, `"3"` for theorem-like blocks, `None` for equations.
    pub number: Option<String>,
}

/// Identifier to number/category mapping.
///
/// Entries are immutable once registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    targets: HashMap<String, Target>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`. Returns `false` if it was already taken.
    pub fn register(&mut self, id: &str, category: Category, number: Option<String>) -> bool {
        if self.targets.contains_key(id) {
            return false;
        }
        self.targets
            .insert(id.to_string(), Target { category, number });
        true
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    pub fn category(&self, id: &str) -> Option<Category> {
        self.get(id).map(|t| t.category)
    }

    pub fn number(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|t| t.number.as_deref())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

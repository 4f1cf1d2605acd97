//! Per-category filter specification

use crate::predicate::PredicateGroup;
use metacat_graph::{Category, EntityGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One predicate group per category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    groups: BTreeMap<Category, PredicateGroup>,
}

impl FilterSpec {
    /// Specification with no predicates at all
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every category at its default (full range, all tags)
    #[must_use]
    pub fn identity(graph: &EntityGraph) -> Self {
        Self {
            groups: Category::ALL
                .iter()
                .map(|&c| (c, PredicateGroup::identity(graph, c)))
                .collect(),
        }
    }

    /// Group of a category, if one is set
    #[inline]
    #[must_use]
    pub fn group(&self, category: Category) -> Option<&PredicateGroup> {
        self.groups.get(&category)
    }

    /// Replace the group of its category
    pub fn set_group(&mut self, group: PredicateGroup) {
        self.groups.insert(group.category(), group);
    }

    /// Builder form of [`set_group`](Self::set_group)
    #[must_use]
    pub fn with_group(mut self, group: PredicateGroup) -> Self {
        self.set_group(group);
        self
    }

    /// Groups in hierarchy order
    pub fn groups(&self) -> impl Iterator<Item = &PredicateGroup> {
        self.groups.values()
    }

    /// True if every group is at identity
    #[must_use]
    pub fn is_identity(&self, graph: &EntityGraph) -> bool {
        self.groups.values().all(|g| g.is_identity(graph))
    }
}

//! Filter engine
//!
//! Evaluates predicate groups against the graph, one category at a time.
//! Each category is filtered independently; cross-category consistency is
//! the job of [`propagate`](crate::propagate).

use crate::predicate::{Predicate, PredicateGroup};
use crate::spec::FilterSpec;
use crate::subset::Subsets;
use metacat_graph::{Category, Effect, EntityGraph, Intervention, Outcome, Paper, Record, Study};
use std::collections::BTreeSet;

/// Applies filter specifications to one graph
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine<'g> {
    graph: &'g EntityGraph,
}

impl<'g> FilterEngine<'g> {
    /// Engine over a graph
    #[inline]
    #[must_use]
    pub fn new(graph: &'g EntityGraph) -> Self {
        Self { graph }
    }

    /// Records of `R`'s category passing every non-identity predicate
    #[must_use]
    pub fn select<R: Record>(&self, group: &PredicateGroup) -> BTreeSet<R::Id> {
        let active: Vec<&Predicate> = group
            .predicates()
            .filter(|p| p.field().category() == R::CATEGORY)
            .filter(|p| !p.is_identity(self.graph.domain(p.field())))
            .collect();

        let all = R::collection(self.graph);
        let selected: BTreeSet<R::Id> = all
            .values()
            .filter(|r| active.iter().all(|p| p.matches(*r)))
            .map(Record::id)
            .collect();

        tracing::debug!(
            category = %R::CATEGORY,
            active = active.len(),
            selected = selected.len(),
            total = all.len(),
            "category filtered"
        );
        selected
    }

    /// Filter every category independently
    ///
    /// Categories without a group in `spec` are returned in full.
    #[must_use]
    pub fn apply(&self, spec: &FilterSpec) -> Subsets {
        let group = |c: Category| {
            spec.group(c)
                .cloned()
                .unwrap_or_else(|| PredicateGroup::new(c))
        };
        Subsets {
            papers: self.select::<Paper>(&group(Category::Paper)),
            studies: self.select::<Study>(&group(Category::Study)),
            interventions: self.select::<Intervention>(&group(Category::Intervention)),
            outcomes: self.select::<Outcome>(&group(Category::Outcome)),
            effects: self.select::<Effect>(&group(Category::Effect)),
        }
    }
}

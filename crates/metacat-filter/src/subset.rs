//! Selected identifiers per category

use metacat_graph::{Category, EffectId, EntityGraph, InterventionId, OutcomeId, PaperId, StudyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifiers selected in each category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsets {
    /// Selected papers
    pub papers: BTreeSet<PaperId>,
    /// Selected studies
    pub studies: BTreeSet<StudyId>,
    /// Selected interventions
    pub interventions: BTreeSet<InterventionId>,
    /// Selected outcomes
    pub outcomes: BTreeSet<OutcomeId>,
    /// Selected effects
    pub effects: BTreeSet<EffectId>,
}

impl Subsets {
    /// Every record of the graph
    #[must_use]
    pub fn full(graph: &EntityGraph) -> Self {
        Self {
            papers: graph.papers().keys().copied().collect(),
            studies: graph.studies().keys().copied().collect(),
            interventions: graph.interventions().keys().copied().collect(),
            outcomes: graph.outcomes().keys().copied().collect(),
            effects: graph.effects().keys().copied().collect(),
        }
    }

    /// Number of selected records in a category
    #[must_use]
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Paper => self.papers.len(),
            Category::Study => self.studies.len(),
            Category::Intervention => self.interventions.len(),
            Category::Outcome => self.outcomes.len(),
            Category::Effect => self.effects.len(),
        }
    }

    /// True if no effect is selected
    #[inline]
    #[must_use]
    pub fn has_no_effects(&self) -> bool {
        self.effects.is_empty()
    }
}

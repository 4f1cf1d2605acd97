//! Lock propagation
//!
//! Resolves each category to either its fresh filter result or its frozen
//! previous subset, then reconciles effects against the resolved upstream
//! categories and the open categories against the displayed effects. A held
//! lock freezes its category outright.

use crate::subset::Subsets;
use metacat_graph::{
    Category, Effect, EffectId, EntityGraph, InterventionId, OutcomeId, PaperId, StudyId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lock state of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lock {
    /// Use the fresh filter result
    #[default]
    Open,
    /// Keep the previously displayed subset
    Held,
}

impl Lock {
    /// The other state
    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Lock::Open => Lock::Held,
            Lock::Held => Lock::Open,
        }
    }

    /// True if held
    #[inline]
    #[must_use]
    pub fn is_held(self) -> bool {
        self == Lock::Held
    }

    /// Choose between a fresh and a previous subset
    pub fn resolve<'a, T>(self, fresh: &'a T, previous: &'a T) -> Resolution<'a, T> {
        match self {
            Lock::Open => Resolution::Fresh(fresh),
            Lock::Held => Resolution::Frozen(previous),
        }
    }
}

impl From<bool> for Lock {
    fn from(held: bool) -> Self {
        if held {
            Lock::Held
        } else {
            Lock::Open
        }
    }
}

/// Subset chosen for one category
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a, T> {
    /// Fresh filter result
    Fresh(&'a T),
    /// Frozen previous subset
    Frozen(&'a T),
}

impl<T> Clone for Resolution<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Resolution<'_, T> {}

impl<'a, T> Resolution<'a, T> {
    /// The chosen subset
    #[inline]
    #[must_use]
    pub fn subset(self) -> &'a T {
        match self {
            Resolution::Fresh(s) | Resolution::Frozen(s) => s,
        }
    }

    /// True if the previous subset was kept
    #[inline]
    #[must_use]
    pub fn is_frozen(self) -> bool {
        matches!(self, Resolution::Frozen(_))
    }
}

/// Lock state of every category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMap([Lock; 5]);

impl LockMap {
    /// All categories open
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock state of a category
    #[inline]
    #[must_use]
    pub fn get(&self, category: Category) -> Lock {
        self.0[category.index()]
    }

    /// Set the lock state of a category
    pub fn set(&mut self, category: Category, lock: Lock) {
        self.0[category.index()] = lock;
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, category: Category, lock: Lock) -> Self {
        self.set(category, lock);
        self
    }

    /// Flip a category's lock, returning the new state
    pub fn toggle(&mut self, category: Category) -> Lock {
        let next = self.get(category).toggled();
        self.set(category, next);
        next
    }

    /// True if no category is held
    #[must_use]
    pub fn all_open(&self) -> bool {
        self.0.iter().all(|l| !l.is_held())
    }

    /// Held categories in hierarchy order
    pub fn held(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.get(*c).is_held())
    }
}

impl fmt::Display for LockMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held: Vec<&str> = self.held().map(Category::name).collect();
        if held.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&held.join(","))
        }
    }
}

/// Ids referenced by a set of effects
#[derive(Default)]
struct Reached {
    papers: BTreeSet<PaperId>,
    studies: BTreeSet<StudyId>,
    interventions: BTreeSet<InterventionId>,
    outcomes: BTreeSet<OutcomeId>,
}

impl Reached {
    fn from_effects<'a>(effects: impl IntoIterator<Item = &'a Effect>) -> Self {
        let mut reached = Self::default();
        for e in effects {
            reached.papers.insert(e.paper_id);
            reached.studies.insert(e.study_id);
            reached.interventions.insert(e.intervention_id);
            reached.outcomes.insert(e.outcome_id);
        }
        reached
    }
}

/// Narrow an unlocked category to records consistent with the displayed
/// effects; held categories are returned unchanged
fn reconcile<Id: Ord + Copy>(
    resolution: Resolution<'_, BTreeSet<Id>>,
    shown: &BTreeSet<Id>,
    referenced: &BTreeSet<Id>,
    parent_shown: impl Fn(Id) -> bool,
) -> BTreeSet<Id> {
    match resolution {
        Resolution::Frozen(frozen) => frozen.clone(),
        Resolution::Fresh(fresh) => fresh
            .iter()
            .copied()
            .filter(|id| (shown.contains(id) || !referenced.contains(id)) && parent_shown(*id))
            .collect(),
    }
}

/// Combine fresh filter results with frozen subsets into one consistent view
///
/// Categories are resolved in hierarchy order. Unless the Effect lock is
/// held, an effect is kept only if it passed its own filter and its paper,
/// study, intervention and outcome are all in the resolved subsets.
///
/// Unlocked categories are then reconciled against the displayed effects: a
/// record stays only if a displayed effect references it or no effect in the
/// graph does, and a study stays only if its paper is displayed. Held
/// categories are shown exactly as frozen.
#[must_use]
pub fn propagate(
    graph: &EntityGraph,
    fresh: &Subsets,
    previous: &Subsets,
    locks: &LockMap,
) -> Subsets {
    let papers = locks
        .get(Category::Paper)
        .resolve(&fresh.papers, &previous.papers);
    let studies = locks
        .get(Category::Study)
        .resolve(&fresh.studies, &previous.studies);
    let interventions = locks
        .get(Category::Intervention)
        .resolve(&fresh.interventions, &previous.interventions);
    let outcomes = locks
        .get(Category::Outcome)
        .resolve(&fresh.outcomes, &previous.outcomes);

    let effects: BTreeSet<EffectId> = match locks
        .get(Category::Effect)
        .resolve(&fresh.effects, &previous.effects)
    {
        Resolution::Frozen(frozen) => frozen.clone(),
        Resolution::Fresh(candidates) => candidates
            .iter()
            .copied()
            .filter(|id| {
                graph.effect(*id).is_some_and(|e| {
                    papers.subset().contains(&e.paper_id)
                        && studies.subset().contains(&e.study_id)
                        && interventions.subset().contains(&e.intervention_id)
                        && outcomes.subset().contains(&e.outcome_id)
                })
            })
            .collect(),
    };

    let shown = Reached::from_effects(effects.iter().filter_map(|id| graph.effect(*id)));
    let referenced = Reached::from_effects(graph.effects().values());

    let papers = reconcile(papers, &shown.papers, &referenced.papers, |_| true);
    let studies = reconcile(studies, &shown.studies, &referenced.studies, |id| {
        graph.study(id).is_some_and(|s| papers.contains(&s.paper_id))
    });
    let interventions = reconcile(
        interventions,
        &shown.interventions,
        &referenced.interventions,
        |_| true,
    );
    let outcomes = reconcile(outcomes, &shown.outcomes, &referenced.outcomes, |_| true);

    tracing::debug!(
        held = %locks,
        papers = papers.len(),
        studies = studies.len(),
        effects = effects.len(),
        "locks propagated"
    );

    Subsets {
        papers,
        studies,
        interventions,
        outcomes,
        effects,
    }
}

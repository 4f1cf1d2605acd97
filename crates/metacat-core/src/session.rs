//! Interactive filtering session
//!
//! Holds the current filter specification, the lock map and the displayed
//! dataset. Every submission recomputes the display from fresh filter
//! results and the previous display; nothing else changes it.

use crate::config::ExportConfig;
use crate::error::SessionError;
use crate::request::AnalysisRequest;
use metacat_filter::{
    propagate, FilterEngine, FilterForm, FilterSpec, Lock, LockMap, Subsets, ValidationErrors,
};
use metacat_graph::{
    Category, Effect, EntityGraph, Intervention, Outcome, Paper, Record, Study,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Counts of the displayed dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Papers shown
    pub papers: usize,
    /// Studies shown
    pub studies: usize,
    /// Interventions shown
    pub interventions: usize,
    /// Outcomes shown
    pub outcomes: usize,
    /// Effects shown
    pub effects: usize,
    /// Participants across both arms of the shown effects
    pub participants: u64,
}

/// One analyst's filtering state over a shared graph
#[derive(Debug, Clone)]
pub struct Session {
    graph: Arc<EntityGraph>,
    spec: FilterSpec,
    locks: LockMap,
    displayed: Subsets,
    export: ExportConfig,
}

impl Session {
    /// Session showing the whole graph
    #[must_use]
    pub fn new(graph: Arc<EntityGraph>) -> Self {
        let spec = FilterSpec::identity(&graph);
        let displayed = Subsets::full(&graph);
        Self {
            graph,
            spec,
            locks: LockMap::new(),
            displayed,
            export: ExportConfig::default(),
        }
    }

    /// With export settings
    #[must_use]
    pub fn with_export_config(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// The shared graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &Arc<EntityGraph> {
        &self.graph
    }

    /// Current filter specification
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Current locks
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &LockMap {
        &self.locks
    }

    /// Displayed dataset
    #[inline]
    #[must_use]
    pub fn displayed(&self) -> &Subsets {
        &self.displayed
    }

    /// Validate forms and refresh the display
    ///
    /// Each form replaces its category's predicates; categories without a
    /// form keep theirs. Nothing changes if any form is invalid.
    ///
    /// # Errors
    /// `SessionError::Validation` with every rejected field of every form
    pub fn submit(&mut self, forms: &[FilterForm]) -> Result<&Subsets, SessionError> {
        let mut spec = self.spec.clone();
        let mut errors = ValidationErrors::new();
        for form in forms {
            match form.validate(&self.graph) {
                Ok(group) => spec.set_group(group),
                Err(e) => errors.extend(e),
            }
        }
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "filter submission rejected");
            return Err(errors.into());
        }

        let fresh = FilterEngine::new(&self.graph).apply(&spec);
        self.displayed = propagate(&self.graph, &fresh, &self.displayed, &self.locks);
        self.spec = spec;
        tracing::info!(
            forms = forms.len(),
            locks = %self.locks,
            effects = self.displayed.effects.len(),
            "filters applied"
        );
        Ok(&self.displayed)
    }

    /// Set one category's lock; the display is unchanged until the next submission
    pub fn set_lock(&mut self, category: Category, lock: Lock) {
        self.locks.set(category, lock);
        tracing::debug!(%category, ?lock, "lock set");
    }

    /// Flip one category's lock, returning the new state
    pub fn toggle_lock(&mut self, category: Category) -> Lock {
        let lock = self.locks.toggle(category);
        tracing::debug!(%category, ?lock, "lock toggled");
        lock
    }

    /// Default filters, no locks, whole graph shown
    pub fn reset(&mut self) {
        self.spec = FilterSpec::identity(&self.graph);
        self.locks = LockMap::new();
        self.displayed = Subsets::full(&self.graph);
        tracing::debug!("session reset");
    }

    /// Counts of the displayed dataset
    #[must_use]
    pub fn summary(&self) -> Summary {
        let participants = self
            .displayed
            .effects
            .iter()
            .filter_map(|id| self.graph.effect(*id))
            .map(Effect::participants)
            .sum();
        Summary {
            papers: self.displayed.papers.len(),
            studies: self.displayed.studies.len(),
            interventions: self.displayed.interventions.len(),
            outcomes: self.displayed.outcomes.len(),
            effects: self.displayed.effects.len(),
            participants,
        }
    }

    /// Engine request for the displayed effects
    #[must_use]
    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest::from_effects(&self.graph, &self.displayed.effects)
    }

    /// CSV of the displayed records of one category
    ///
    /// Configured excluded columns are dropped as well as `excluded`.
    ///
    /// # Errors
    /// `SessionError::Export` if serialization fails
    pub fn export_csv(&self, category: Category, excluded: &[&str]) -> Result<String, SessionError> {
        let mut exclude: Vec<&str> = self.export.excluded_columns.iter().map(String::as_str).collect();
        exclude.extend_from_slice(excluded);

        let csv = match category {
            Category::Paper => self.export_rows::<Paper>(&self.displayed.papers, &exclude),
            Category::Study => self.export_rows::<Study>(&self.displayed.studies, &exclude),
            Category::Intervention => self.export_rows::<Intervention>(&self.displayed.interventions, &exclude),
            Category::Outcome => self.export_rows::<Outcome>(&self.displayed.outcomes, &exclude),
            Category::Effect => self.export_rows::<Effect>(&self.displayed.effects, &exclude),
        }?;
        tracing::debug!(%category, bytes = csv.len(), "csv exported");
        Ok(csv)
    }

    /// Axis ticks spanning the 95% intervals of the displayed effects
    #[must_use]
    pub fn effect_axis(&self, target_ticks: usize) -> Vec<f64> {
        let bounds = self
            .displayed
            .effects
            .iter()
            .filter_map(|id| self.graph.effect(*id))
            .filter_map(Effect::interval_95)
            .fold(None, |acc: Option<(f64, f64)>, (lo, hi)| {
                Some(acc.map_or((lo, hi), |(min, max)| (min.min(lo), max.max(hi))))
            });
        match bounds {
            Some((min, max)) => metacat_stats::generate_ticks(min, max, target_ticks),
            None => Vec::new(),
        }
    }

    fn export_rows<R>(&self, ids: &BTreeSet<R::Id>, exclude: &[&str]) -> Result<String, SessionError>
    where
        R: Record + Serialize,
    {
        let all = R::collection(&self.graph);
        let rows: Vec<&R> = ids.iter().filter_map(|id| all.get(id)).collect();
        Ok(metacat_graph::to_csv(&rows, exclude)?)
    }
}

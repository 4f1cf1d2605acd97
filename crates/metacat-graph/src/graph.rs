//! The entity graph
//!
//! Built once from a [`Dataset`], validated for referential consistency, and
//! read-only afterwards. Field domains are computed here so every consumer
//! agrees on what "the full range" or "all tags" means.

use crate::category::{Category, Field, FieldKind};
use crate::dataset::Dataset;
use crate::entity::{Effect, Intervention, Outcome, Paper, Sample, Study};
use crate::error::GraphError;
use crate::ids::{EffectId, InterventionId, OutcomeId, PaperId, SampleId, StudyId};
use crate::record::Record;
use crate::tags::TagSet;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Observed values of a field across the whole graph
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDomain {
    /// No record carries a value for the field
    Empty,
    /// Smallest and largest observed value
    Numeric {
        /// Minimum
        min: f64,
        /// Maximum
        max: f64,
    },
    /// Smallest arm size over all records (missing arms count as zero)
    Arms {
        /// Smallest arm
        smallest: u32,
    },
    /// Union of all tags
    Tags(TagSet),
}

impl FieldDomain {
    /// Tag universe, if this is a tag domain
    #[must_use]
    pub fn tags(&self) -> Option<&TagSet> {
        match self {
            FieldDomain::Tags(tags) => Some(tags),
            _ => None,
        }
    }
}

static EMPTY_DOMAIN: FieldDomain = FieldDomain::Empty;

/// Immutable relational view over the five entity categories
#[derive(Debug, Clone)]
pub struct EntityGraph {
    papers: BTreeMap<PaperId, Paper>,
    studies: BTreeMap<StudyId, Study>,
    samples: BTreeMap<SampleId, Sample>,
    interventions: BTreeMap<InterventionId, Intervention>,
    outcomes: BTreeMap<OutcomeId, Outcome>,
    effects: BTreeMap<EffectId, Effect>,
    domains: HashMap<Field, FieldDomain>,
}

impl EntityGraph {
    /// Build and validate a graph from a raw dataset
    ///
    /// # Errors
    /// - `GraphError::DuplicateId` for repeated identifiers
    /// - `GraphError::DanglingReference` for unresolved foreign keys
    /// - `GraphError::InconsistentPaper` if an effect's study belongs to another paper
    /// - `GraphError::MissingPrecision` / `GraphError::InvalidNumber` for unusable effects
    pub fn from_dataset(dataset: Dataset) -> Result<Self, GraphError> {
        let Dataset {
            papers,
            studies,
            samples,
            interventions,
            outcomes,
            effects,
        } = dataset;

        let papers = index("paper", papers, |p| p.id)?;
        let studies = index("study", studies, |s| s.id)?;
        let samples = index("sample", samples, |s| s.id)?;
        let interventions = index("intervention", interventions, |i| i.id)?;
        let outcomes = index("outcome", outcomes, |o| o.id)?;
        let effects = index("effect", effects, |e| e.id)?;

        for study in studies.values() {
            if !papers.contains_key(&study.paper_id) {
                return Err(GraphError::dangling("study", study.id, "paper", study.paper_id));
            }
        }
        for sample in samples.values() {
            if !studies.contains_key(&sample.study_id) {
                return Err(GraphError::dangling("sample", sample.id, "study", sample.study_id));
            }
        }
        for effect in effects.values() {
            check_effect(effect, &papers, &studies, &interventions, &outcomes)?;
        }

        let mut graph = Self {
            papers,
            studies,
            samples,
            interventions,
            outcomes,
            effects,
            domains: HashMap::new(),
        };
        graph.domains = Field::ALL
            .iter()
            .map(|&field| (field, graph.compute_domain(field)))
            .collect();

        tracing::info!(
            papers = graph.papers.len(),
            studies = graph.studies.len(),
            interventions = graph.interventions.len(),
            outcomes = graph.outcomes.len(),
            effects = graph.effects.len(),
            "entity graph loaded"
        );
        Ok(graph)
    }

    /// Parse and build from JSON text
    ///
    /// # Errors
    /// Any parse or validation error
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Self::from_dataset(Dataset::from_json_str(json)?)
    }

    /// Read, parse and build from a dataset file
    ///
    /// # Errors
    /// Any IO, parse or validation error
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        Self::from_dataset(Dataset::from_path(path)?)
    }

    /// All papers
    #[inline]
    #[must_use]
    pub fn papers(&self) -> &BTreeMap<PaperId, Paper> {
        &self.papers
    }

    /// All studies
    #[inline]
    #[must_use]
    pub fn studies(&self) -> &BTreeMap<StudyId, Study> {
        &self.studies
    }

    /// All samples
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &BTreeMap<SampleId, Sample> {
        &self.samples
    }

    /// All interventions
    #[inline]
    #[must_use]
    pub fn interventions(&self) -> &BTreeMap<InterventionId, Intervention> {
        &self.interventions
    }

    /// All outcomes
    #[inline]
    #[must_use]
    pub fn outcomes(&self) -> &BTreeMap<OutcomeId, Outcome> {
        &self.outcomes
    }

    /// All effects
    #[inline]
    #[must_use]
    pub fn effects(&self) -> &BTreeMap<EffectId, Effect> {
        &self.effects
    }

    /// Look up a paper
    #[inline]
    #[must_use]
    pub fn paper(&self, id: PaperId) -> Option<&Paper> {
        self.papers.get(&id)
    }

    /// Look up a study
    #[inline]
    #[must_use]
    pub fn study(&self, id: StudyId) -> Option<&Study> {
        self.studies.get(&id)
    }

    /// Look up an intervention
    #[inline]
    #[must_use]
    pub fn intervention(&self, id: InterventionId) -> Option<&Intervention> {
        self.interventions.get(&id)
    }

    /// Look up an outcome
    #[inline]
    #[must_use]
    pub fn outcome(&self, id: OutcomeId) -> Option<&Outcome> {
        self.outcomes.get(&id)
    }

    /// Look up an effect
    #[inline]
    #[must_use]
    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(&id)
    }

    /// Samples drawn for a study
    pub fn samples_of(&self, study: StudyId) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.values().filter(move |s| s.study_id == study)
    }

    /// Number of records in a category
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

    /// Observed domain of a field
    #[must_use]
    pub fn domain(&self, field: Field) -> &FieldDomain {
        self.domains.get(&field).unwrap_or(&EMPTY_DOMAIN)
    }

    /// Option set of a tag field (empty for non-tag fields)
    #[must_use]
    pub fn options(&self, field: Field) -> TagSet {
        self.domain(field).tags().cloned().unwrap_or_default()
    }

    fn compute_domain(&self, field: Field) -> FieldDomain {
        match field.category() {
            Category::Paper => domain_of(Paper::collection(self), field),
            Category::Study => domain_of(Study::collection(self), field),
            Category::Intervention => domain_of(Intervention::collection(self), field),
            Category::Outcome => domain_of(Outcome::collection(self), field),
            Category::Effect => domain_of(Effect::collection(self), field),
        }
    }
}

fn index<K: Ord + ToString, V>(
    kind: &'static str,
    items: Vec<V>,
    key: impl Fn(&V) -> K,
) -> Result<BTreeMap<K, V>, GraphError> {
    let mut map = BTreeMap::new();
    for item in items {
        let k = key(&item);
        if map.contains_key(&k) {
            return Err(GraphError::DuplicateId {
                kind,
                id: k.to_string(),
            });
        }
        map.insert(k, item);
    }
    Ok(map)
}

fn check_effect(
    effect: &Effect,
    papers: &BTreeMap<PaperId, Paper>,
    studies: &BTreeMap<StudyId, Study>,
    interventions: &BTreeMap<InterventionId, Intervention>,
    outcomes: &BTreeMap<OutcomeId, Outcome>,
) -> Result<(), GraphError> {
    if !papers.contains_key(&effect.paper_id) {
        return Err(GraphError::dangling("effect", effect.id, "paper", effect.paper_id));
    }
    let study = studies
        .get(&effect.study_id)
        .ok_or_else(|| GraphError::dangling("effect", effect.id, "study", effect.study_id))?;
    if study.paper_id != effect.paper_id {
        return Err(GraphError::InconsistentPaper {
            effect: effect.id,
            effect_paper: effect.paper_id,
            study: study.id,
            study_paper: study.paper_id,
        });
    }
    if !interventions.contains_key(&effect.intervention_id) {
        return Err(GraphError::dangling(
            "effect",
            effect.id,
            "intervention",
            effect.intervention_id,
        ));
    }
    if !outcomes.contains_key(&effect.outcome_id) {
        return Err(GraphError::dangling("effect", effect.id, "outcome", effect.outcome_id));
    }

    let invalid = |field: &'static str, value: f64| GraphError::InvalidNumber {
        effect: effect.id,
        field,
        value,
    };
    if !effect.effect_size.is_finite() {
        return Err(invalid("effect_size", effect.effect_size));
    }
    if let Some(v) = effect.variance {
        if !v.is_finite() || v < 0.0 {
            return Err(invalid("variance", v));
        }
    }
    if let Some(se) = effect.std_error {
        if !se.is_finite() || se < 0.0 {
            return Err(invalid("std_error", se));
        }
    }
    if let Some(p) = effect.p_value {
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid("p_value", p));
        }
    }
    if effect.sampling_variance().is_none() {
        return Err(GraphError::MissingPrecision(effect.id));
    }
    Ok(())
}

fn domain_of<R: Record>(records: &BTreeMap<R::Id, R>, field: Field) -> FieldDomain {
    match field.kind() {
        FieldKind::Numeric => {
            let mut values = records.values().filter_map(|r| r.number(field));
            match values.next() {
                None => FieldDomain::Empty,
                Some(first) => {
                    let (min, max) =
                        values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
                    FieldDomain::Numeric { min, max }
                }
            }
        }
        FieldKind::Arms => records
            .values()
            .filter_map(|r| r.arms().map(|a| a.smaller()))
            .min()
            .map_or(FieldDomain::Empty, |smallest| FieldDomain::Arms { smallest }),
        FieldKind::Tags => {
            let mut universe = TagSet::new();
            for record in records.values() {
                if let Some(tags) = record.tags(field) {
                    universe.extend_from(&tags);
                }
            }
            FieldDomain::Tags(universe)
        }
    }
}

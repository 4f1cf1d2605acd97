//! Uniform field access over entity records
//!
//! The filter layer never matches on concrete entity types. It reads numeric
//! values, tag sets and arm sizes through [`Record`], keyed by [`Field`].

use crate::category::{Category, Field};
use crate::entity::{ArmSizes, Effect, Intervention, Outcome, Paper, Study};
use crate::graph::EntityGraph;
use crate::ids::{EffectId, InterventionId, OutcomeId, PaperId, StudyId};
use crate::tags::TagSet;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

/// An entity that can be filtered
pub trait Record: Sized {
    /// Identifier type
    type Id: Copy + Ord + Hash + fmt::Debug + fmt::Display;

    /// Category the record belongs to
    const CATEGORY: Category;

    /// Record identifier
    fn id(&self) -> Self::Id;

    /// Numeric value of a field, if the record has one
    fn number(&self, _field: Field) -> Option<f64> {
        None
    }

    /// Tag set of a field, if the field is a facet of this record
    fn tags(&self, _field: Field) -> Option<Cow<'_, TagSet>> {
        None
    }

    /// Arm sizes, for records that carry them
    fn arms(&self) -> Option<ArmSizes> {
        None
    }

    /// All records of this category in the graph
    fn collection(graph: &EntityGraph) -> &BTreeMap<Self::Id, Self>;
}

impl Record for Paper {
    type Id = PaperId;
    const CATEGORY: Category = Category::Paper;

    fn id(&self) -> PaperId {
        self.id
    }

    fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::Year => Some(f64::from(self.year)),
            _ => None,
        }
    }

    fn tags(&self, field: Field) -> Option<Cow<'_, TagSet>> {
        match field {
            Field::Source => Some(Cow::Owned(if self.source.trim().is_empty() {
                TagSet::new()
            } else {
                TagSet::single(self.source.trim())
            })),
            Field::OpenAccess => Some(Cow::Owned(TagSet::flag(self.open_access))),
            Field::DataAvailable => Some(Cow::Owned(TagSet::flag(self.data_available))),
            _ => None,
        }
    }

    fn collection(graph: &EntityGraph) -> &BTreeMap<PaperId, Self> {
        graph.papers()
    }
}

impl Record for Study {
    type Id = StudyId;
    const CATEGORY: Category = Category::Study;

    fn id(&self) -> StudyId {
        self.id
    }

    fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::SampleSize => self.sample_size.map(f64::from),
            _ => None,
        }
    }

    fn tags(&self, field: Field) -> Option<Cow<'_, TagSet>> {
        match field {
            Field::Randomization => Some(Cow::Borrowed(&self.randomization)),
            Field::ConditionAssignment => Some(Cow::Borrowed(&self.condition_assignment)),
            Field::Preregistered => Some(Cow::Owned(TagSet::flag(self.preregistered))),
            _ => None,
        }
    }

    fn collection(graph: &EntityGraph) -> &BTreeMap<StudyId, Self> {
        graph.studies()
    }
}

impl Record for Intervention {
    type Id = InterventionId;
    const CATEGORY: Category = Category::Intervention;

    fn id(&self) -> InterventionId {
        self.id
    }

    fn tags(&self, field: Field) -> Option<Cow<'_, TagSet>> {
        match field {
            Field::Content => Some(Cow::Borrowed(&self.content)),
            Field::Mechanism => Some(Cow::Borrowed(&self.mechanism)),
            Field::Medium => Some(Cow::Borrowed(&self.medium)),
            _ => None,
        }
    }

    fn collection(graph: &EntityGraph) -> &BTreeMap<InterventionId, Self> {
        graph.interventions()
    }
}

impl Record for Outcome {
    type Id = OutcomeId;
    const CATEGORY: Category = Category::Outcome;

    fn id(&self) -> OutcomeId {
        self.id
    }

    fn tags(&self, field: Field) -> Option<Cow<'_, TagSet>> {
        match field {
            Field::OutcomeCategory => Some(Cow::Borrowed(&self.category)),
            Field::OutcomeSubcategory => Some(Cow::Borrowed(&self.subcategory)),
            Field::Measurement => Some(Cow::Borrowed(&self.measurement)),
            _ => None,
        }
    }

    fn collection(graph: &EntityGraph) -> &BTreeMap<OutcomeId, Self> {
        graph.outcomes()
    }
}

impl Record for Effect {
    type Id = EffectId;
    const CATEGORY: Category = Category::Effect;

    fn id(&self) -> EffectId {
        self.id
    }

    fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::EffectSize => Some(self.effect_size),
            Field::StdError => self.standard_error(),
            Field::PValue => self.p_value,
            _ => None,
        }
    }

    fn arms(&self) -> Option<ArmSizes> {
        Some(self.arm_sizes())
    }

    fn collection(graph: &EntityGraph) -> &BTreeMap<EffectId, Self> {
        graph.effects()
    }
}

//! Predicates and predicate groups
//!
//! One tagged variant covers every filterable field kind. A group holds at
//! most one predicate per field and is evaluated as a conjunction.

use crate::error::ValidationError;
use metacat_graph::{Category, EntityGraph, Field, FieldDomain, FieldKind, Record, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single validated predicate over one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Inclusive numeric range
    Range {
        /// Field to test
        field: Field,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },
    /// Both arms at least `min`
    Threshold {
        /// Field to test
        field: Field,
        /// Minimum arm size
        min: u32,
    },
    /// Any selected tag present
    AnyOf {
        /// Field to test
        field: Field,
        /// Selected tags; empty matches nothing
        tags: TagSet,
    },
}

impl Predicate {
    /// Inclusive range predicate
    #[must_use]
    pub fn range(field: Field, min: f64, max: f64) -> Self {
        Self::Range { field, min, max }
    }

    /// Minimum-arm-size predicate
    #[must_use]
    pub fn threshold(field: Field, min: u32) -> Self {
        Self::Threshold { field, min }
    }

    /// Tag-membership predicate
    #[must_use]
    pub fn any_of<I, S>(field: Field, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf {
            field,
            tags: tags.into_iter().collect(),
        }
    }

    /// Field this predicate tests
    #[inline]
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Range { field, .. } | Self::Threshold { field, .. } | Self::AnyOf { field, .. } => {
                *field
            }
        }
    }

    /// Field kind this predicate applies to
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Range { .. } => FieldKind::Numeric,
            Self::Threshold { .. } => FieldKind::Arms,
            Self::AnyOf { .. } => FieldKind::Tags,
        }
    }

    /// Test one record
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Self::Range { field, min, max } => record
                .number(*field)
                .is_some_and(|v| *min <= v && v <= *max),
            Self::Threshold { min, .. } => record.arms().is_some_and(|a| a.both_at_least(*min)),
            Self::AnyOf { field, tags } => record
                .tags(*field)
                .is_some_and(|have| have.intersects(tags)),
        }
    }

    /// True if the predicate retains every record of the domain
    ///
    /// An empty tag selection is never identity, and a range over a field
    /// with no observed values is not either.
    #[must_use]
    pub fn is_identity(&self, domain: &FieldDomain) -> bool {
        match (self, domain) {
            (Self::Range { min, max, .. }, FieldDomain::Numeric { min: lo, max: hi }) => {
                *min <= *lo && *hi <= *max
            }
            (Self::Threshold { min, .. }, FieldDomain::Arms { smallest }) => *min <= *smallest,
            (Self::Threshold { .. }, FieldDomain::Empty) => true,
            (Self::AnyOf { tags, .. }, FieldDomain::Tags(universe)) => {
                !tags.is_empty() && universe.is_subset(tags)
            }
            _ => false,
        }
    }

    /// Structural checks independent of the graph
    ///
    /// # Errors
    /// - `KindMismatch` if the predicate kind does not fit the field
    /// - `NonFinite` / `InvertedRange` for bad range bounds
    /// - `InvalidThreshold` for a zero threshold
    pub fn check(&self) -> Result<(), ValidationError> {
        let field = self.field();
        if field.kind() != self.kind() {
            return Err(ValidationError::KindMismatch {
                field,
                expected: field.kind(),
            });
        }
        match self {
            Self::Range { min, max, .. } => {
                for bound in [*min, *max] {
                    if !bound.is_finite() {
                        return Err(ValidationError::NonFinite(bound));
                    }
                }
                if min > max {
                    return Err(ValidationError::InvertedRange {
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            Self::Threshold { min, .. } if *min == 0 => {
                Err(ValidationError::InvalidThreshold(min.to_string()))
            }
            Self::Threshold { .. } | Self::AnyOf { .. } => Ok(()),
        }
    }
}

/// The predicates of one category, at most one per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateGroup {
    category: Category,
    predicates: BTreeMap<Field, Predicate>,
}

impl PredicateGroup {
    /// Group with no predicates (matches everything)
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            predicates: BTreeMap::new(),
        }
    }

    /// Default configuration for a category: full ranges and all tags.
    ///
    /// Fields without observed values get no predicate. Tag fields whose
    /// option set is empty are left out as well, since an empty selection
    /// would match nothing.
    #[must_use]
    pub fn identity(graph: &EntityGraph, category: Category) -> Self {
        let mut group = Self::new(category);
        for field in category.fields() {
            let predicate = match graph.domain(field) {
                FieldDomain::Numeric { min, max } => Predicate::range(field, *min, *max),
                FieldDomain::Tags(universe) if !universe.is_empty() => Predicate::AnyOf {
                    field,
                    tags: universe.clone(),
                },
                _ => continue,
            };
            group.predicates.insert(field, predicate);
        }
        group
    }

    /// Category this group filters
    #[inline]
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Set or replace the predicate for its field
    ///
    /// # Errors
    /// `WrongCategory` if the field belongs elsewhere, or any error of
    /// [`Predicate::check`]
    pub fn set(&mut self, predicate: Predicate) -> Result<(), ValidationError> {
        let field = predicate.field();
        if field.category() != self.category {
            return Err(ValidationError::WrongCategory {
                field,
                expected: self.category,
                actual: field.category(),
            });
        }
        predicate.check()?;
        self.predicates.insert(field, predicate);
        Ok(())
    }

    /// Builder form of [`set`](Self::set)
    ///
    /// # Errors
    /// Same as [`set`](Self::set)
    pub fn with(mut self, predicate: Predicate) -> Result<Self, ValidationError> {
        self.set(predicate)?;
        Ok(self)
    }

    /// Select every option of a tag field
    ///
    /// # Errors
    /// `WrongCategory` or `KindMismatch` for non-tag fields
    pub fn select_all(&mut self, graph: &EntityGraph, field: Field) -> Result<(), ValidationError> {
        self.set(Predicate::AnyOf {
            field,
            tags: graph.options(field),
        })
    }

    /// Deselect every option of a tag field (matches nothing)
    ///
    /// # Errors
    /// `WrongCategory` or `KindMismatch` for non-tag fields
    pub fn clear(&mut self, field: Field) -> Result<(), ValidationError> {
        self.set(Predicate::AnyOf {
            field,
            tags: TagSet::new(),
        })
    }

    /// Drop the predicate for a field
    pub fn remove(&mut self, field: Field) -> Option<Predicate> {
        self.predicates.remove(&field)
    }

    /// Predicate for a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Predicate> {
        self.predicates.get(&field)
    }

    /// Predicates in field order
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.values()
    }

    /// Number of predicates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// True if the group holds no predicates
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// True if every predicate is at its identity configuration
    #[must_use]
    pub fn is_identity(&self, graph: &EntityGraph) -> bool {
        self.predicates
            .values()
            .all(|p| p.is_identity(graph.domain(p.field())))
    }

    /// Test one record against every predicate
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.predicates.values().all(|p| p.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metacat_graph::{Effect, EffectId, InterventionId, OutcomeId, PaperId, StudyId};

    fn effect(size: f64, control: Option<u32>, intervention: Option<u32>) -> Effect {
        Effect {
            id: EffectId(1),
            paper_id: PaperId(1),
            study_id: StudyId(1),
            intervention_id: InterventionId(1),
            outcome_id: OutcomeId(1),
            effect_size: size,
            variance: Some(0.04),
            std_error: None,
            p_value: None,
            n_control: control,
            n_intervention: intervention,
            intervention_condition: String::new(),
            control_condition: String::new(),
        }
    }

    #[test]
    fn range_is_inclusive() {
        let p = Predicate::range(Field::EffectSize, 0.1, 0.5);
        assert!(p.matches(&effect(0.1, None, None)));
        assert!(p.matches(&effect(0.5, None, None)));
        assert!(!p.matches(&effect(0.51, None, None)));
    }

    #[test]
    fn range_fails_missing_value() {
        let p = Predicate::range(Field::PValue, 0.0, 1.0);
        assert!(!p.matches(&effect(0.2, None, None)));
    }

    #[test]
    fn threshold_needs_both_arms() {
        let p = Predicate::threshold(Field::ArmSizes, 50);
        assert!(p.matches(&effect(0.2, Some(50), Some(80))));
        assert!(!p.matches(&effect(0.2, Some(49), Some(80))));
        assert!(!p.matches(&effect(0.2, None, Some(80))));
    }

    #[test]
    fn threshold_identity_at_smallest_arm() {
        let domain = FieldDomain::Arms { smallest: 20 };
        assert!(Predicate::threshold(Field::ArmSizes, 20).is_identity(&domain));
        assert!(!Predicate::threshold(Field::ArmSizes, 21).is_identity(&domain));
    }

    #[test]
    fn tag_identity_requires_full_universe() {
        let domain = FieldDomain::Tags(TagSet::parse("text;video"));
        assert!(Predicate::any_of(Field::Medium, ["text", "video"]).is_identity(&domain));
        assert!(!Predicate::any_of(Field::Medium, ["video"]).is_identity(&domain));
        let empty = Predicate::any_of(Field::Medium, Vec::<String>::new());
        assert!(!empty.is_identity(&FieldDomain::Tags(TagSet::new())));
    }

    #[test]
    fn range_over_empty_domain_is_not_identity() {
        assert!(!Predicate::range(Field::PValue, 0.0, 1.0).is_identity(&FieldDomain::Empty));
    }

    #[test]
    fn check_rejects_bad_shapes() {
        assert_eq!(
            Predicate::range(Field::Medium, 0.0, 1.0).check(),
            Err(ValidationError::KindMismatch {
                field: Field::Medium,
                expected: FieldKind::Tags
            })
        );
        assert_eq!(
            Predicate::range(Field::Year, 2020.0, 2010.0).check(),
            Err(ValidationError::InvertedRange {
                min: 2020.0,
                max: 2010.0
            })
        );
        assert!(matches!(
            Predicate::range(Field::Year, f64::NAN, 2010.0).check(),
            Err(ValidationError::NonFinite(_))
        ));
        assert!(Predicate::threshold(Field::ArmSizes, 0).check().is_err());
    }

    #[test]
    fn group_rejects_foreign_field() {
        let mut group = PredicateGroup::new(Category::Paper);
        let err = group
            .set(Predicate::range(Field::EffectSize, 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, ValidationError::WrongCategory { .. }));
        assert!(group.is_empty());
    }

    #[test]
    fn group_is_conjunction() {
        let group = PredicateGroup::new(Category::Effect)
            .with(Predicate::range(Field::EffectSize, 0.0, 1.0))
            .unwrap()
            .with(Predicate::threshold(Field::ArmSizes, 10))
            .unwrap();
        assert!(group.matches(&effect(0.3, Some(10), Some(10))));
        assert!(!group.matches(&effect(0.3, Some(9), Some(10))));
        assert!(!group.matches(&effect(1.3, Some(10), Some(10))));
    }
}

//! Raw filter input and its validation
//!
//! Forms carry whatever the user typed. [`FilterForm::validate`] turns a form
//! into a [`PredicateGroup`] or reports every bad field at once.

use crate::error::{FilterFileError, ValidationError, ValidationErrors};
use crate::predicate::{Predicate, PredicateGroup};
use metacat_graph::{Category, EntityGraph, Field, FieldKind, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A bound as submitted: a number or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Already numeric
    Number(f64),
    /// Text to be parsed
    Text(String),
}

impl RawValue {
    /// Parse as a number
    ///
    /// # Errors
    /// `NotNumeric` if the text does not parse
    pub fn to_number(&self) -> Result<f64, ValidationError> {
        match self {
            RawValue::Number(n) => Ok(*n),
            RawValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::NotNumeric(s.clone())),
        }
    }

    fn display(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// One predicate as submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPredicate {
    /// Numeric range
    Range {
        /// Field name
        field: String,
        /// Lower bound
        min: RawValue,
        /// Upper bound
        max: RawValue,
    },
    /// Minimum arm size
    Threshold {
        /// Field name
        field: String,
        /// Minimum
        min: RawValue,
    },
    /// Explicit tag selection
    AnyOf {
        /// Field name
        field: String,
        /// Selected tags
        #[serde(default)]
        tags: Vec<String>,
    },
    /// Every option of the field
    SelectAll {
        /// Field name
        field: String,
    },
}

impl RawPredicate {
    /// Field name as submitted
    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Self::Range { field, .. }
            | Self::Threshold { field, .. }
            | Self::AnyOf { field, .. }
            | Self::SelectAll { field } => field,
        }
    }

    /// Resolve to a typed predicate; `None` when the field is left at identity
    fn resolve(
        &self,
        graph: &EntityGraph,
        category: Category,
    ) -> Result<(Field, Option<Predicate>), ValidationError> {
        let name = self.field_name();
        let field: Field = name
            .parse()
            .map_err(|_| ValidationError::UnknownField(name.to_string()))?;
        if field.category() != category {
            return Err(ValidationError::WrongCategory {
                field,
                expected: category,
                actual: field.category(),
            });
        }

        let predicate = match self {
            Self::Range { min, max, .. } => Predicate::range(field, min.to_number()?, max.to_number()?),
            Self::Threshold { min, .. } => Predicate::threshold(field, whole_positive(min)?),
            Self::AnyOf { tags, .. } => {
                let options = graph.options(field);
                let selected: TagSet = tags
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .collect();
                if field.kind() == FieldKind::Tags {
                    if let Some(unknown) = selected.iter().find(|t| !options.contains(t.as_str())) {
                        return Err(ValidationError::UnknownOption {
                            field,
                            tag: unknown.clone(),
                        });
                    }
                }
                Predicate::AnyOf {
                    field,
                    tags: selected,
                }
            }
            Self::SelectAll { .. } => {
                let options = graph.options(field);
                if options.is_empty() {
                    return Ok((field, None));
                }
                Predicate::AnyOf {
                    field,
                    tags: options,
                }
            }
        };
        predicate.check()?;
        Ok((field, Some(predicate)))
    }
}

fn whole_positive(raw: &RawValue) -> Result<u32, ValidationError> {
    let n = raw.to_number()?;
    if n.fract() != 0.0 || n < 1.0 || n > f64::from(u32::MAX) {
        return Err(ValidationError::InvalidThreshold(raw.display()));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(n as u32)
}

/// Raw predicates for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterForm {
    /// Category being filtered
    pub category: Category,
    /// Submitted predicates
    #[serde(default)]
    pub predicates: Vec<RawPredicate>,
}

impl FilterForm {
    /// Empty form for a category
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            predicates: Vec::new(),
        }
    }

    /// Add a predicate
    #[must_use]
    pub fn with(mut self, predicate: RawPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Validate against the graph
    ///
    /// # Errors
    /// Every field that failed, in submission order
    pub fn validate(&self, graph: &EntityGraph) -> Result<PredicateGroup, ValidationErrors> {
        let mut group = PredicateGroup::new(self.category);
        let mut errors = ValidationErrors::new();
        let mut seen = BTreeSet::new();

        for raw in &self.predicates {
            let name = raw.field_name();
            match raw.resolve(graph, self.category) {
                Ok((field, _)) if !seen.insert(field) => {
                    errors.push(self.category, name, ValidationError::DuplicateField(field));
                }
                Ok((_, Some(predicate))) => {
                    if let Err(e) = group.set(predicate) {
                        errors.push(self.category, name, e);
                    }
                }
                Ok((_, None)) => {}
                Err(e) => errors.push(self.category, name, e),
            }
        }

        errors.into_result()?;
        Ok(group)
    }
}

/// Filter file: raw predicates listed per category
///
/// ```toml
/// [[effect]]
/// kind = "threshold"
/// field = "arm_sizes"
/// min = 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterForms {
    /// Paper predicates
    #[serde(default)]
    pub paper: Vec<RawPredicate>,
    /// Study predicates
    #[serde(default)]
    pub study: Vec<RawPredicate>,
    /// Intervention predicates
    #[serde(default)]
    pub intervention: Vec<RawPredicate>,
    /// Outcome predicates
    #[serde(default)]
    pub outcome: Vec<RawPredicate>,
    /// Effect predicates
    #[serde(default)]
    pub effect: Vec<RawPredicate>,
}

impl FilterForms {
    /// Parse a filter file
    ///
    /// # Errors
    /// `FilterFileError::Toml` if the text does not match the schema
    pub fn from_toml_str(text: &str) -> Result<Self, FilterFileError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a filter file
    ///
    /// # Errors
    /// `FilterFileError::Io` or `FilterFileError::Toml`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FilterFileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| FilterFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// One form per category that has predicates
    #[must_use]
    pub fn into_forms(self) -> Vec<FilterForm> {
        [
            (Category::Paper, self.paper),
            (Category::Study, self.study),
            (Category::Intervention, self.intervention),
            (Category::Outcome, self.outcome),
            (Category::Effect, self.effect),
        ]
        .into_iter()
        .filter(|(_, predicates)| !predicates.is_empty())
        .map(|(category, predicates)| FilterForm {
            category,
            predicates,
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph() -> EntityGraph {
        EntityGraph::from_json_str(
            r#"{
            "papers": [{"id": 1, "year": 2012, "source": "journal"}],
            "studies": [{"id": 1, "paper_id": 1}],
            "interventions": [{"id": 1, "medium": "video; text"}],
            "outcomes": [{"id": 1, "category": "behavior"}],
            "effects": [{"id": 1, "paper_id": 1, "study_id": 1, "intervention_id": 1,
                         "outcome_id": 1, "effect_size": 0.1, "variance": 0.01}]
        }"#,
        )
        .unwrap()
    }

    fn range(field: &str, min: impl Into<RawValue>, max: impl Into<RawValue>) -> RawPredicate {
        RawPredicate::Range {
            field: field.to_string(),
            min: min.into(),
            max: max.into(),
        }
    }

    #[test]
    fn accepts_text_numbers() {
        let group = FilterForm::new(Category::Paper)
            .with(range("year", " 2010 ", 2020.0))
            .validate(&graph())
            .unwrap();
        assert_eq!(
            group.get(Field::Year),
            Some(&Predicate::range(Field::Year, 2010.0, 2020.0))
        );
    }

    #[test]
    fn collects_every_field_error() {
        let errors = FilterForm::new(Category::Paper)
            .with(range("year", "soon", 2020.0))
            .with(range("effect_size", 0.0, 1.0))
            .with(range("colour", 0.0, 1.0))
            .validate(&graph())
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.errors()[0].error,
            ValidationError::NotNumeric("soon".to_string())
        );
        assert!(matches!(
            errors.errors()[1].error,
            ValidationError::WrongCategory { .. }
        ));
        assert_eq!(
            errors.for_field("colour").next().map(|e| &e.error),
            Some(&ValidationError::UnknownField("colour".to_string()))
        );
    }

    #[test]
    fn threshold_must_be_positive_whole_number() {
        for bad in [RawValue::from(0.0), RawValue::from(-5.0), RawValue::from("12.5")] {
            let errors = FilterForm::new(Category::Effect)
                .with(RawPredicate::Threshold {
                    field: "arm_sizes".to_string(),
                    min: bad,
                })
                .validate(&graph())
                .unwrap_err();
            assert!(matches!(
                errors.errors()[0].error,
                ValidationError::InvalidThreshold(_)
            ));
        }
    }

    #[test]
    fn select_all_expands_options() {
        let group = FilterForm::new(Category::Intervention)
            .with(RawPredicate::SelectAll {
                field: "medium".to_string(),
            })
            .validate(&graph())
            .unwrap();
        assert_eq!(
            group.get(Field::Medium),
            Some(&Predicate::any_of(Field::Medium, ["text", "video"]))
        );
    }

    #[test]
    fn select_all_without_options_keeps_everything() {
        let graph = graph();
        assert!(graph.options(Field::OutcomeSubcategory).is_empty());

        let group = FilterForm::new(Category::Outcome)
            .with(RawPredicate::SelectAll {
                field: "outcome_subcategory".to_string(),
            })
            .validate(&graph)
            .unwrap();
        assert_eq!(group.get(Field::OutcomeSubcategory), None);
        assert!(group.is_identity(&graph));

        let errors = FilterForm::new(Category::Outcome)
            .with(RawPredicate::SelectAll {
                field: "outcome_subcategory".to_string(),
            })
            .with(RawPredicate::SelectAll {
                field: "outcome_subcategory".to_string(),
            })
            .validate(&graph)
            .unwrap_err();
        assert_eq!(
            errors.errors()[0].error,
            ValidationError::DuplicateField(Field::OutcomeSubcategory)
        );
    }

    #[test]
    fn rejects_unknown_option_and_duplicates() {
        let errors = FilterForm::new(Category::Intervention)
            .with(RawPredicate::AnyOf {
                field: "medium".to_string(),
                tags: vec!["radio".to_string()],
            })
            .with(RawPredicate::SelectAll {
                field: "medium".to_string(),
            })
            .with(RawPredicate::SelectAll {
                field: "medium".to_string(),
            })
            .validate(&graph())
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors.errors()[0].error,
            ValidationError::UnknownOption { .. }
        ));
        assert_eq!(
            errors.errors()[1].error,
            ValidationError::DuplicateField(Field::Medium)
        );
    }

    #[test]
    fn empty_any_of_is_accepted() {
        let group = FilterForm::new(Category::Outcome)
            .with(RawPredicate::AnyOf {
                field: "outcome_category".to_string(),
                tags: Vec::new(),
            })
            .validate(&graph())
            .unwrap();
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn parses_filter_file() {
        let forms = FilterForms::from_toml_str(
            r#"
            [[paper]]
            kind = "range"
            field = "year"
            min = 2010
            max = "2020"

            [[effect]]
            kind = "threshold"
            field = "arm_sizes"
            min = 50

            [[intervention]]
            kind = "any_of"
            field = "medium"
            tags = ["video"]
            "#,
        )
        .unwrap();
        let forms = forms.into_forms();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[0].category, Category::Paper);
        assert_eq!(forms[2].category, Category::Effect);

        let graph = graph();
        for form in &forms {
            form.validate(&graph).unwrap();
        }
    }

    #[test]
    fn json_form_payload() {
        let form: FilterForm = serde_json::from_str(
            r#"{
                "category": "paper",
                "predicates": [
                    {"kind": "range", "field": "year", "min": "2011", "max": 2013},
                    {"kind": "any_of", "field": "source", "tags": [" journal ", ""]}
                ]
            }"#,
        )
        .unwrap();
        let group = form.validate(&graph()).unwrap();
        assert_eq!(
            group.get(Field::Source),
            Some(&Predicate::any_of(Field::Source, ["journal"]))
        );
        assert_eq!(
            group.get(Field::Year),
            Some(&Predicate::range(Field::Year, 2011.0, 2013.0))
        );
    }

    #[test]
    fn filter_file_rejects_unknown_category() {
        let err = FilterForms::from_toml_str("[[sample]]\nkind = \"select_all\"\nfield = \"x\"\n");
        assert!(matches!(err, Err(FilterFileError::Toml(_))));
    }
}

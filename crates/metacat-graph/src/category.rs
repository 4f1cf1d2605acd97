//! Entity categories and the catalogue of filterable fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity category, ordered by hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Published papers
    Paper,
    /// Studies within papers
    Study,
    /// Intervention facets
    Intervention,
    /// Outcome facets
    Outcome,
    /// Effect sizes
    Effect,
}

impl Category {
    /// All categories in hierarchy order (Paper → Study → Intervention/Outcome → Effect)
    pub const ALL: [Category; 5] = [
        Category::Paper,
        Category::Study,
        Category::Intervention,
        Category::Outcome,
        Category::Effect,
    ];

    /// Position in [`Category::ALL`]
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Category::Paper => 0,
            Category::Study => 1,
            Category::Intervention => 2,
            Category::Outcome => 3,
            Category::Effect => 4,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Paper => "paper",
            Category::Study => "study",
            Category::Intervention => "intervention",
            Category::Outcome => "outcome",
            Category::Effect => "effect",
        }
    }

    /// Filterable fields of this category
    #[must_use]
    pub fn fields(self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| f.category() == self)
            .collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// How a field is filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Inclusive numeric range
    Numeric,
    /// Minimum size on both control and intervention arms
    Arms,
    /// Any-of membership over a tag set
    Tags,
}

/// A filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Paper publication year
    Year,
    /// Paper source (journal, report, thesis)
    Source,
    /// Paper is open access
    OpenAccess,
    /// Paper has open data
    DataAvailable,
    /// Study sample size
    SampleSize,
    /// Study randomization unit
    Randomization,
    /// Study condition assignment
    ConditionAssignment,
    /// Study was preregistered
    Preregistered,
    /// Intervention content (e.g. animal welfare)
    Content,
    /// Intervention mechanism (e.g. factual, norms)
    Mechanism,
    /// Intervention medium (e.g. video, text)
    Medium,
    /// Outcome category (behavior, intention, attitude)
    OutcomeCategory,
    /// Outcome subcategory
    OutcomeSubcategory,
    /// Outcome measurement type
    Measurement,
    /// Standardized effect size
    EffectSize,
    /// Effect standard error
    StdError,
    /// Effect p-value
    PValue,
    /// Control and intervention arm sizes
    ArmSizes,
}

impl Field {
    /// Every field
    pub const ALL: [Field; 18] = [
        Field::Year,
        Field::Source,
        Field::OpenAccess,
        Field::DataAvailable,
        Field::SampleSize,
        Field::Randomization,
        Field::ConditionAssignment,
        Field::Preregistered,
        Field::Content,
        Field::Mechanism,
        Field::Medium,
        Field::OutcomeCategory,
        Field::OutcomeSubcategory,
        Field::Measurement,
        Field::EffectSize,
        Field::StdError,
        Field::PValue,
        Field::ArmSizes,
    ];

    /// Category owning the field
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Field::Year | Field::Source | Field::OpenAccess | Field::DataAvailable => {
                Category::Paper
            }
            Field::SampleSize
            | Field::Randomization
            | Field::ConditionAssignment
            | Field::Preregistered => Category::Study,
            Field::Content | Field::Mechanism | Field::Medium => Category::Intervention,
            Field::OutcomeCategory | Field::OutcomeSubcategory | Field::Measurement => {
                Category::Outcome
            }
            Field::EffectSize | Field::StdError | Field::PValue | Field::ArmSizes => {
                Category::Effect
            }
        }
    }

    /// Predicate kind the field accepts
    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Year
            | Field::SampleSize
            | Field::EffectSize
            | Field::StdError
            | Field::PValue => FieldKind::Numeric,
            Field::ArmSizes => FieldKind::Arms,
            _ => FieldKind::Tags,
        }
    }

    /// Snake-case name, as used in filter files
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Source => "source",
            Field::OpenAccess => "open_access",
            Field::DataAvailable => "data_available",
            Field::SampleSize => "sample_size",
            Field::Randomization => "randomization",
            Field::ConditionAssignment => "condition_assignment",
            Field::Preregistered => "preregistered",
            Field::Content => "content",
            Field::Mechanism => "mechanism",
            Field::Medium => "medium",
            Field::OutcomeCategory => "outcome_category",
            Field::OutcomeSubcategory => "outcome_subcategory",
            Field::Measurement => "measurement",
            Field::EffectSize => "effect_size",
            Field::StdError => "std_error",
            Field::PValue => "p_value",
            Field::ArmSizes => "arm_sizes",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Name that matches no category or field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name: '{0}'")]
pub struct UnknownName(pub String);

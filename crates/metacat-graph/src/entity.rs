//! Entity records
//!
//! Records are immutable once loaded. The working set is always derived by
//! selecting identifiers, never by editing a record.

use crate::ids::{EffectId, InterventionId, OutcomeId, PaperId, SampleId, StudyId};
use crate::tags::TagSet;
use serde::{Deserialize, Serialize};

/// A published paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper identifier
    pub id: PaperId,
    /// Publication year
    pub year: i32,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Author list as printed
    #[serde(default)]
    pub authors: String,
    /// Venue or source type
    #[serde(default)]
    pub source: String,
    /// Openly accessible full text
    #[serde(default)]
    pub open_access: bool,
    /// Underlying data publicly available
    #[serde(default)]
    pub data_available: bool,
}

/// A study reported in a paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    /// Study identifier
    pub id: StudyId,
    /// Parent paper
    pub paper_id: PaperId,
    /// Total participants
    #[serde(default)]
    pub sample_size: Option<u32>,
    /// Randomization unit (individual, cluster, ...)
    #[serde(default)]
    pub randomization: TagSet,
    /// How participants were assigned to conditions
    #[serde(default)]
    pub condition_assignment: TagSet,
    /// Study was preregistered
    #[serde(default)]
    pub preregistered: bool,
}

/// A participant group within a study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sample identifier
    pub id: SampleId,
    /// Owning study
    pub study_id: StudyId,
    /// Description (population, country)
    #[serde(default)]
    pub label: String,
    /// Number of participants
    #[serde(default)]
    pub size: Option<u32>,
}

/// Descriptive facets of an intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    /// Intervention identifier
    pub id: InterventionId,
    /// Content tags (animal welfare, health, environment)
    #[serde(default)]
    pub content: TagSet,
    /// Mechanism tags (factual, norms, emotional)
    #[serde(default)]
    pub mechanism: TagSet,
    /// Medium tags (video, text, in-person)
    #[serde(default)]
    pub medium: TagSet,
}

/// Descriptive facets of an outcome measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Outcome identifier
    pub id: OutcomeId,
    /// Category tags (behavior, intention, attitude)
    #[serde(default)]
    pub category: TagSet,
    /// Subcategory tags
    #[serde(default)]
    pub subcategory: TagSet,
    /// Measurement tags (survey, sales data, food diary, meal choice)
    #[serde(default)]
    pub measurement: TagSet,
}

/// One extracted statistical result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Effect identifier
    pub id: EffectId,
    /// Paper the effect was extracted from
    pub paper_id: PaperId,
    /// Study the effect belongs to
    pub study_id: StudyId,
    /// Intervention facets
    pub intervention_id: InterventionId,
    /// Outcome facets
    pub outcome_id: OutcomeId,
    /// Standardized mean difference
    pub effect_size: f64,
    /// Sampling variance
    #[serde(default)]
    pub variance: Option<f64>,
    /// Standard error
    #[serde(default)]
    pub std_error: Option<f64>,
    /// Reported p-value
    #[serde(default)]
    pub p_value: Option<f64>,
    /// Control-arm size
    #[serde(default)]
    pub n_control: Option<u32>,
    /// Intervention-arm size
    #[serde(default)]
    pub n_intervention: Option<u32>,
    /// Label of the intervention condition
    #[serde(default)]
    pub intervention_condition: String,
    /// Label of the control condition
    #[serde(default)]
    pub control_condition: String,
}

/// Control and intervention arm sizes, missing arms counted as zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmSizes {
    /// Control arm
    pub control: u32,
    /// Intervention arm
    pub intervention: u32,
}

impl ArmSizes {
    /// Smaller of the two arms
    #[inline]
    #[must_use]
    pub fn smaller(self) -> u32 {
        self.control.min(self.intervention)
    }

    /// Both arms meet `min`
    #[inline]
    #[must_use]
    pub fn both_at_least(self, min: u32) -> bool {
        self.control >= min && self.intervention >= min
    }
}

impl Effect {
    /// Sampling variance, from `variance` or else the squared standard error
    #[must_use]
    pub fn sampling_variance(&self) -> Option<f64> {
        self.variance.or_else(|| self.std_error.map(|se| se * se))
    }

    /// Standard error, from `std_error` or else the root of `variance`
    #[must_use]
    pub fn standard_error(&self) -> Option<f64> {
        self.std_error.or_else(|| self.variance.map(f64::sqrt))
    }

    /// Arm sizes with missing arms as zero
    #[must_use]
    pub fn arm_sizes(&self) -> ArmSizes {
        ArmSizes {
            control: self.n_control.unwrap_or(0),
            intervention: self.n_intervention.unwrap_or(0),
        }
    }

    /// Participants across both arms
    #[must_use]
    pub fn participants(&self) -> u64 {
        let arms = self.arm_sizes();
        u64::from(arms.control) + u64::from(arms.intervention)
    }

    /// Normal-approximation 95% interval around the effect size
    #[must_use]
    pub fn interval_95(&self) -> Option<(f64, f64)> {
        self.standard_error().map(|se| {
            let half = 1.96 * se;
            (self.effect_size - half, self.effect_size + half)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect() -> Effect {
        Effect {
            id: EffectId(1),
            paper_id: PaperId(1),
            study_id: StudyId(1),
            intervention_id: InterventionId(1),
            outcome_id: OutcomeId(1),
            effect_size: 0.3,
            variance: None,
            std_error: Some(0.1),
            p_value: None,
            n_control: Some(40),
            n_intervention: None,
            intervention_condition: "video".into(),
            control_condition: "no video".into(),
        }
    }

    #[test]
    fn precision_falls_back_between_variance_and_se() {
        let e = effect();
        assert!((e.sampling_variance().unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(e.standard_error(), Some(0.1));

        let e = Effect {
            variance: Some(0.04),
            std_error: None,
            ..effect()
        };
        assert!((e.standard_error().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_arm_counts_as_zero() {
        let arms = effect().arm_sizes();
        assert_eq!(arms, ArmSizes { control: 40, intervention: 0 });
        assert_eq!(arms.smaller(), 0);
        assert!(!arms.both_at_least(1));
        assert_eq!(effect().participants(), 40);
    }

    #[test]
    fn effect_deserializes_with_defaults() {
        let json = r#"{
            "id": 3, "paper_id": 1, "study_id": 2,
            "intervention_id": 4, "outcome_id": 5,
            "effect_size": -0.12, "variance": 0.02
        }"#;
        let e: Effect = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, EffectId(3));
        assert!(e.n_control.is_none());
        assert!(e.control_condition.is_empty());
    }
}

//! Result decoding
//!
//! The engine answers with seven numbers in fixed order:
//! pooled estimate, robust CI lower, robust CI upper, then Egger's test
//! coefficient, standard error, z-value and p-value.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Length of the engine result vector
pub const RESULT_LEN: usize = 7;

/// Egger's regression test for funnel-plot asymmetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggerTest {
    /// Moderator coefficient
    pub coefficient: f64,
    /// Its standard error
    pub std_error: f64,
    /// Its z-value
    pub z_value: f64,
    /// Its p-value
    pub p_value: f64,
}

/// Pooled effect-size estimate of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Pooled standardized mean difference
    pub estimate: f64,
    /// Robust 95% CI lower bound
    pub ci_lower: f64,
    /// Robust 95% CI upper bound
    pub ci_upper: f64,
    /// Publication-bias test
    pub egger: EggerTest,
    /// Effects analysed
    pub effect_count: usize,
    /// Paper/study clusters analysed
    pub cluster_count: usize,
}

impl Estimate {
    /// Probability that a random intervention-group value beats a random
    /// control-group value
    #[must_use]
    pub fn probability_of_superiority(&self) -> f64 {
        metacat_stats::p_sup(self.estimate)
    }

    /// True if Egger's p-value is below `alpha` (false when not estimated)
    #[must_use]
    pub fn is_significant_bias(&self, alpha: f64) -> bool {
        self.egger.p_value < alpha
    }

    /// True if the interval excludes zero
    #[must_use]
    pub fn excludes_zero(&self) -> bool {
        self.ci_lower > 0.0 || self.ci_upper < 0.0
    }
}

/// Map the engine's result vector onto an [`Estimate`]
///
/// # Errors
/// - `DecodeError::WrongLength` unless exactly [`RESULT_LEN`] values
/// - `DecodeError::NonFinite` if the estimate or a bound is NaN or infinite
pub fn decode(
    values: &[f64],
    effect_count: usize,
    cluster_count: usize,
) -> Result<Estimate, DecodeError> {
    let &[estimate, ci_lower, ci_upper, coefficient, std_error, z_value, p_value] = values else {
        return Err(DecodeError::WrongLength {
            expected: RESULT_LEN,
            actual: values.len(),
        });
    };

    for (field, value) in [
        ("estimate", estimate),
        ("ci_lower", ci_lower),
        ("ci_upper", ci_upper),
    ] {
        if !value.is_finite() {
            return Err(DecodeError::NonFinite { field, value });
        }
    }

    Ok(Estimate {
        estimate,
        ci_lower,
        ci_upper,
        egger: EggerTest {
            coefficient,
            std_error,
            z_value,
            p_value,
        },
        effect_count,
        cluster_count,
    })
}

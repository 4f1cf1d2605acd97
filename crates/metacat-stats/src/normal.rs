//! Normal-distribution transforms and effect-size overlap statistics
//!
//! The error function comes from `statrs`; everything here is expressed
//! through it.

use std::f64::consts::SQRT_2;

pub use statrs::function::erf::{erf, erfc};

/// Normal cumulative distribution function
///
/// `cdf_normal(x, mean, sd) = (1 - erf((mean - x) / (sqrt(2) * sd))) / 2`
#[must_use]
pub fn cdf_normal(x: f64, mean: f64, sd: f64) -> f64 {
    (1.0 - erf((mean - x) / (SQRT_2 * sd))) / 2.0
}

/// Standard normal CDF (`mean = 0`, `sd = 1`)
#[inline]
#[must_use]
pub fn standard_cdf(x: f64) -> f64 {
    cdf_normal(x, 0.0, 1.0)
}

/// Probability of superiority for a standardized mean difference `d`
///
/// Probability that a randomly drawn intervention-group observation is
/// lower than a randomly drawn control-group observation.
#[inline]
#[must_use]
pub fn p_sup(d: f64) -> f64 {
    standard_cdf(d / SQRT_2)
}

/// Cohen's U1, proportion of non-overlap between the two distributions
#[inline]
#[must_use]
pub fn u1(d: f64) -> f64 {
    1.0 - 2.0 * standard_cdf(-d.abs() / 2.0)
}

/// Cohen's U3, proportion of one group below the other group's mean
#[inline]
#[must_use]
pub fn u3(d: f64) -> f64 {
    standard_cdf(d)
}

//! Metacat Statistical Utilities
//!
//! Pure, stateless numeric helpers shared by the analysis pipeline and by
//! anything that presents its results.
//!
//! # Core Concepts
//!
//! - [`erf`] / [`cdf_normal`]: error function and normal CDF
//! - [`p_sup`], [`u1`], [`u3`]: overlap and dominance statistics for a
//!   standardized mean difference
//! - [`round`]: decimal rounding with floating-point error compensation
//! - [`generate_ticks`]: "nice" axis ticks
//!
//! # Example
//!
//! ```rust
//! use metacat_stats::{cdf_normal, p_sup, round};
//!
//! assert_eq!(cdf_normal(0.0, 0.0, 1.0), 0.5);
//! assert_eq!(p_sup(0.0), 0.5);
//! assert_eq!(round(1.005, 2), 1.01);
//! ```

#![warn(unreachable_pub)]

mod normal;
mod rounding;
mod ticks;

pub use normal::{cdf_normal, erf, erfc, p_sup, standard_cdf, u1, u3};
pub use rounding::round;
pub use ticks::{generate_ticks, tick_step};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Decimal rounding

/// Round `num` to `digits` decimal places, half away from zero.
///
/// The scaled value is nudged outward by one relative machine epsilon before
/// rounding, so decimal literals whose binary representation sits just below
/// a half (`1.005`, `2.005`) round the way they read.
///
/// Negative `digits` round to tens, hundreds, and so on.
#[must_use]
pub fn round(num: f64, digits: i32) -> f64 {
    if !num.is_finite() {
        return num;
    }

    let factor = 10_f64.powi(digits.abs());
    let scaled = if digits >= 0 { num * factor } else { num / factor };
    if !scaled.is_finite() {
        return num;
    }

    let rounded = (scaled.abs() * (1.0 + f64::EPSILON)).round().copysign(num);
    if digits >= 0 {
        rounded / factor
    } else {
        rounded * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn representation_error_is_compensated() {
        assert_eq!(round(1.005, 2), 1.01);
        assert_eq!(round(2.005, 2), 2.01);
        assert_eq!(round(1.255, 2), 1.26);
        assert_eq!(round(-1.005, 2), -1.01);
    }

    #[test]
    fn ordinary_values() {
        assert_eq!(round(0.123_456, 3), 0.123);
        assert_eq!(round(2.5, 0), 3.0);
        assert_eq!(round(-2.5, 0), -3.0);
        assert_eq!(round(1234.0, -2), 1200.0);
        assert_eq!(round(0.0, 4), 0.0);
    }

    #[test]
    fn non_finite_passthrough() {
        assert!(round(f64::NAN, 2).is_nan());
        assert_eq!(round(f64::INFINITY, 2), f64::INFINITY);
        assert_eq!(round(1e300, 20), 1e300);
    }

    proptest! {
        #[test]
        fn prop_round_is_within_half_unit(x in -1.0e6f64..1.0e6, digits in 0i32..6) {
            let r = round(x, digits);
            let unit = 10_f64.powi(-digits);
            prop_assert!((r - x).abs() <= unit / 2.0 + x.abs() * 1e-12);
        }

        #[test]
        fn prop_round_is_idempotent(x in -1.0e4f64..1.0e4, digits in 0i32..4) {
            let once = round(x, digits);
            prop_assert_eq!(round(once, digits), once);
        }
    }
}

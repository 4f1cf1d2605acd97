//! Axis tick generation
//!
//! Ticks are multiples of a "nice" step (1, 2 or 5 times a power of ten)
//! that fall inside the requested interval. Tick values are produced from
//! integer multipliers so they stay free of accumulated floating-point drift.

/// Step thresholds on the normalised raw step (sqrt(50), sqrt(10), sqrt(2))
const STEP_10: f64 = 7.071_067_811_865_476;
const STEP_5: f64 = 3.162_277_660_168_379_5;
const STEP_2: f64 = 1.414_213_562_373_095_1;

/// Integer range and increment for a tick sequence.
///
/// A negative `inc` means ticks are `i / -inc`, otherwise `i * inc`.
#[derive(Debug, Clone, Copy)]
struct TickSpec {
    first: i64,
    last: i64,
    inc: f64,
}

impl TickSpec {
    fn compute(start: f64, stop: f64, count: usize) -> Option<Self> {
        #[allow(clippy::cast_precision_loss)]
        let raw = (stop - start) / count as f64;
        if !raw.is_finite() || raw <= 0.0 {
            return None;
        }

        let power = raw.log10().floor();
        let error = raw / 10_f64.powf(power);
        let factor = if error >= STEP_10 {
            10.0
        } else if error >= STEP_5 {
            5.0
        } else if error >= STEP_2 {
            2.0
        } else {
            1.0
        };

        #[allow(clippy::cast_possible_truncation)]
        let spec = if power < 0.0 {
            let inc = 10_f64.powf(-power) / factor;
            let mut first = (start * inc).round() as i64;
            let mut last = (stop * inc).round() as i64;
            if (first as f64) / inc < start {
                first += 1;
            }
            if (last as f64) / inc > stop {
                last -= 1;
            }
            Self {
                first,
                last,
                inc: -inc,
            }
        } else {
            let inc = 10_f64.powf(power) * factor;
            let mut first = (start / inc).round() as i64;
            let mut last = (stop / inc).round() as i64;
            if (first as f64) * inc < start {
                first += 1;
            }
            if (last as f64) * inc > stop {
                last -= 1;
            }
            Self { first, last, inc }
        };
        Some(spec)
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(&self, i: i64) -> f64 {
        if self.inc < 0.0 {
            i as f64 / -self.inc
        } else {
            i as f64 * self.inc
        }
    }

    fn step(&self) -> f64 {
        if self.inc < 0.0 {
            1.0 / -self.inc
        } else {
            self.inc
        }
    }
}

/// The "nice" step `generate_ticks` would use for an interval.
///
/// Returns `None` for empty or non-finite intervals.
#[must_use]
pub fn tick_step(min: f64, max: f64, target_count: usize) -> Option<f64> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    TickSpec::compute(lo, hi, target_count.max(1)).map(|s| s.step())
}

/// Generate ascending axis ticks spanning `[min, max]`.
///
/// - Out-of-order bounds are swapped.
/// - `min == max` yields the single tick `[min]`.
/// - An endpoint is added when it is itself nice (an integer or a
///   half-integer) and not already a tick.
/// - Non-finite bounds yield no ticks.
#[must_use]
pub fn generate_ticks(min: f64, max: f64, target_count: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if lo == hi {
        return vec![lo];
    }

    let mut ticks: Vec<f64> = match TickSpec::compute(lo, hi, target_count.max(1)) {
        Some(spec) if spec.first <= spec.last => {
            (spec.first..=spec.last).map(|i| spec.value(i)).collect()
        }
        _ => Vec::new(),
    };

    if is_nice(lo) && ticks.first().map_or(true, |&t| t > lo) {
        ticks.insert(0, lo);
    }
    if is_nice(hi) && ticks.last().map_or(true, |&t| t < hi) {
        ticks.push(hi);
    }
    ticks
}

fn is_nice(x: f64) -> bool {
    (x * 2.0).fract() == 0.0
}

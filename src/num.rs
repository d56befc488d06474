//! Numeric helpers
//!
//! Prices and scores are plain `f64`. `NaN` and infinities mark a value as
//! invalid; every helper here treats them as such instead of propagating a
//! surprising comparison result.

/// `true` for usable numeric values
#[inline]
pub fn is_valid(value: f64) -> bool {
    value.is_finite()
}

/// Clamp to [0, 1]. Invalid input gives 0.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if !is_valid(value) {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// `numerator / denominator`, or `NaN` when either side is invalid or the
/// denominator is zero.
#[inline]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if !is_valid(numerator) || !is_valid(denominator) || denominator == 0.0 {
        return f64::NAN;
    }
    numerator / denominator
}

/// Larger of two values, ignoring invalid ones. `NaN` only if both are.
#[inline]
pub fn max_valid(a: f64, b: f64) -> f64 {
    match (is_valid(a), is_valid(b)) {
        (true, true) => a.max(b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => f64::NAN,
    }
}

/// Smaller of two values, ignoring invalid ones. `NaN` only if both are.
#[inline]
pub fn min_valid(a: f64, b: f64) -> f64 {
    match (is_valid(a), is_valid(b)) {
        (true, true) => a.min(b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => f64::NAN,
    }
}

//! Parameter metadata for swing detectors and filters
//!
//! Each parameterized detector or filter publishes a table of its tunable
//! values so a caller can sweep them (grid search) or build one from a flat map.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use swingwave::prelude::*;
//!
//! for param in ZigZagSwingDetector::param_meta() {
//!   println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("atr_period", 10.0);
//! let detector = ZigZagSwingDetector::with_params(&params).unwrap();
//! assert_eq!(SwingDetector::name(&detector), "zigzag");
//! ```

use std::collections::HashMap;

use crate::detectors::{
  AdaptiveZigZagConfig, AdaptiveZigZagSwingDetector, FractalSwingDetector, ReversalAmount,
  ZigZagSwingDetector,
};
use crate::filters::{MinMagnitudeSwingFilter, SwingCompressor, DEFAULT_MIN_SWING_BARS};
use crate::{num, Period, Ratio, Result, SwingError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Value in 0.0..=1.0
  Ratio,
  /// Positive integer
  Period,
  /// Non-negative integer (0 allowed)
  Count,
  /// Non-negative real multiplier or absolute amount
  Factor,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "atr_period")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if !num::is_valid(step) || step <= 0.0 {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut i = 0.0;
    loop {
      let v = min + i * step;
      if v > max + 1e-9 {
        break;
      }
      // float drift can overshoot the last step
      values.push(v.min(max));
      i += 1.0;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !num::is_valid(value) {
      return Err(SwingError::InvalidValue("parameter must be finite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(SwingError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Factor => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(SwingError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Count => {
        if value < 0.0 || value.fract() != 0.0 {
          return Err(SwingError::InvalidValue("Count must be a non-negative integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors that can be described by and rebuilt from flat parameters
pub trait ParameterizedDetector: Sized {
  /// Metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector from a map. Missing parameters use their defaults.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Name reported by the built detector
  fn detector_name() -> &'static str;
}

/// Swing filters that can be described by and rebuilt from flat parameters
pub trait ParameterizedFilter: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a filter from a map. Missing parameters use their defaults.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn filter_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !num::is_valid(value) || value < 1.0 || value.fract() != 0.0 {
    return Err(SwingError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Non-negative integer, 0 allowed
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !num::is_valid(value) || value < 0.0 || value.fract() != 0.0 {
    return Err(SwingError::InvalidValue("Count must be a non-negative integer"));
  }
  Ok(value as usize)
}

/// Finite, non-negative real
pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !num::is_valid(value) {
    return Err(SwingError::InvalidValue("Factor must be finite"));
  }
  if value < 0.0 {
    return Err(SwingError::OutOfRange { field: "factor", value, min: 0.0, max: f64::MAX });
  }
  Ok(value)
}

// ============================================================
// DETECTOR TABLES
// ============================================================

const FRACTAL_PARAMS: &[ParamMeta] = &[
  ParamMeta::period(
    "lookback",
    2.0,
    (1.0, 10.0, 1.0),
    "Bars before the candidate that must not exceed it",
  ),
  ParamMeta::period(
    "lookforward",
    2.0,
    (1.0, 10.0, 1.0),
    "Bars after the candidate that must not exceed it",
  ),
  ParamMeta::count(
    "allowed_equal_bars",
    0.0,
    (0.0, 5.0, 1.0),
    "Equal-price bars tolerated on each side of a plateau",
  ),
];

impl ParameterizedDetector for FractalSwingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    FRACTAL_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let lookback = get_period(params, "lookback", 2)?;
    let lookforward = get_period(params, "lookforward", 2)?;
    let allowed_equal_bars = get_count(params, "allowed_equal_bars", 0)?;
    FractalSwingDetector::with_windows(lookback.get(), lookforward.get(), allowed_equal_bars)
  }

  fn detector_name() -> &'static str {
    "fractal"
  }
}

const ZIGZAG_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("atr_period", 14.0, (5.0, 30.0, 1.0), "ATR lookback for the reversal"),
  ParamMeta::factor(
    "atr_multiplier",
    1.0,
    (0.5, 4.0, 0.25),
    "ATR multiple a move must reach to confirm a pivot",
  ),
];

/// ATR-scaled threshold on closing prices
impl ParameterizedDetector for ZigZagSwingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    ZIGZAG_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let period = get_period(params, "atr_period", 14)?;
    let multiplier = get_factor(params, "atr_multiplier", 1.0)?;
    let reversal = ReversalAmount::Atr { period: period.get(), multiplier };
    ZigZagSwingDetector::new(crate::PriceSource::Close, reversal)
  }

  fn detector_name() -> &'static str {
    "zigzag"
  }
}

const ADAPTIVE_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("atr_period", 14.0, (5.0, 30.0, 1.0), "ATR lookback"),
  ParamMeta::factor("atr_multiplier", 1.0, (0.5, 4.0, 0.25), "ATR multiple used as threshold"),
  ParamMeta::factor("min_threshold", 0.0, (0.0, 10.0, 0.5), "Lower threshold bound, 0 disables"),
  ParamMeta::factor("max_threshold", 0.0, (0.0, 50.0, 1.0), "Upper threshold bound, 0 disables"),
  ParamMeta::period(
    "smoothing_period",
    3.0,
    (1.0, 10.0, 1.0),
    "SMA period applied to the threshold, 1 disables",
  ),
];

impl ParameterizedDetector for AdaptiveZigZagSwingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    ADAPTIVE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let config = AdaptiveZigZagConfig::new(
      get_period(params, "atr_period", 14)?.get(),
      get_factor(params, "atr_multiplier", 1.0)?,
      get_factor(params, "min_threshold", 0.0)?,
      get_factor(params, "max_threshold", 0.0)?,
      get_period(params, "smoothing_period", 3)?.get(),
    )?;
    AdaptiveZigZagSwingDetector::new(config)
  }

  fn detector_name() -> &'static str {
    "adaptive_zigzag"
  }
}

// ============================================================
// FILTER TABLES
// ============================================================

const MAGNITUDE_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
  "relative_threshold",
  0.3,
  (0.05, 1.0, 0.05),
  "Share of the largest amplitude a swing must reach",
)];

impl ParameterizedFilter for MinMagnitudeSwingFilter {
  fn param_meta() -> &'static [ParamMeta] {
    MAGNITUDE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    MinMagnitudeSwingFilter::with_ratio(get_ratio(params, "relative_threshold", 0.3)?)
  }

  fn filter_name() -> &'static str {
    "min_magnitude"
  }
}

const COMPRESSOR_PARAMS: &[ParamMeta] = &[
  ParamMeta::factor("min_amplitude", 0.0, (0.0, 10.0, 0.5), "Absolute price move, 0 disables"),
  ParamMeta::count("min_length", 2.0, (0.0, 10.0, 1.0), "Bars a swing must span"),
];

impl ParameterizedFilter for SwingCompressor {
  fn param_meta() -> &'static [ParamMeta] {
    COMPRESSOR_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    SwingCompressor::new(
      get_factor(params, "min_amplitude", 0.0)?,
      get_count(params, "min_length", DEFAULT_MIN_SWING_BARS)?,
    )
  }

  fn filter_name() -> &'static str {
    "compressor"
  }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;
  use crate::SwingDetector;

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_validate_period_and_count() {
    let period = ParamMeta::period("p", 14.0, (10.0, 20.0, 2.0), "");
    assert!(period.validate(14.0).is_ok());
    assert!(period.validate(14.5).is_err());
    assert!(period.validate(22.0).is_err());

    let count = ParamMeta::count("c", 0.0, (0.0, 5.0, 1.0), "");
    assert!(count.validate(0.0).is_ok());
    assert!(count.validate(1.5).is_err());
    assert!(count.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_value_helpers() {
    let mut params = HashMap::new();
    params.insert("ratio", 0.8);
    params.insert("period", 20.0);
    params.insert("negative", -1.0);

    assert!((get_ratio(&params, "ratio", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert_eq!(get_period(&params, "period", 14).unwrap().get(), 20);
    assert_eq!(get_period(&params, "missing", 14).unwrap().get(), 14);
    assert_eq!(get_count(&params, "missing", 0).unwrap(), 0);
    assert!(get_count(&params, "negative", 0).is_err());
    assert!(get_factor(&params, "negative", 1.0).is_err());
  }

  #[test]
  fn test_defaults_match_tables() {
    let empty = HashMap::new();

    let fractal = FractalSwingDetector::with_params(&empty).unwrap();
    let windows = (fractal.lookback(), fractal.lookforward(), fractal.allowed_equal_bars());
    assert_eq!(windows, (2, 2, 0));

    let adaptive = AdaptiveZigZagSwingDetector::with_params(&empty).unwrap();
    assert_eq!(*adaptive.config(), AdaptiveZigZagConfig::default());

    let zigzag = ZigZagSwingDetector::with_params(&empty).unwrap();
    assert_eq!(zigzag.reversal(), &ReversalAmount::Atr { period: 14, multiplier: 1.0 });
  }

  #[test]
  fn test_names_agree_with_detectors() {
    let empty = HashMap::new();
    assert_eq!(
      FractalSwingDetector::detector_name(),
      FractalSwingDetector::with_params(&empty).unwrap().name()
    );
    assert_eq!(
      ZigZagSwingDetector::detector_name(),
      ZigZagSwingDetector::with_params(&empty).unwrap().name()
    );
    assert_eq!(
      AdaptiveZigZagSwingDetector::detector_name(),
      AdaptiveZigZagSwingDetector::with_params(&empty).unwrap().name()
    );
  }

  #[test]
  fn test_every_grid_point_builds() {
    for meta in AdaptiveZigZagSwingDetector::param_meta() {
      for value in meta.generate_grid() {
        assert!(meta.validate(value).is_ok(), "{} = {}", meta.name, value);
      }
    }
  }

  #[test]
  fn test_invalid_override_rejected() {
    let mut params = HashMap::new();
    params.insert("lookback", 0.0);
    assert!(FractalSwingDetector::with_params(&params).is_err());

    let mut params = HashMap::new();
    params.insert("min_threshold", 5.0);
    params.insert("max_threshold", 2.0);
    assert!(AdaptiveZigZagSwingDetector::with_params(&params).is_err());
  }

  #[test]
  fn test_magnitude_filter_from_ratio_param() {
    let meta = MinMagnitudeSwingFilter::param_meta();
    assert_eq!(meta[0].param_type, ParamType::Ratio);

    let filter = MinMagnitudeSwingFilter::with_params(&HashMap::new()).unwrap();
    assert!((filter.relative_threshold() - 0.3).abs() < 1e-12);

    let mut params = HashMap::new();
    params.insert("relative_threshold", 0.65);
    let filter = MinMagnitudeSwingFilter::with_params(&params).unwrap();
    assert!((filter.relative_threshold() - 0.65).abs() < 1e-12);

    // Ratio bounds, then the filter's own zero check
    params.insert("relative_threshold", 1.5);
    assert!(MinMagnitudeSwingFilter::with_params(&params).is_err());
    params.insert("relative_threshold", 0.0);
    assert!(MinMagnitudeSwingFilter::with_params(&params).is_err());

    for value in meta[0].generate_grid() {
      assert!(meta[0].validate(value).is_ok());
      assert!(MinMagnitudeSwingFilter::new(value).is_ok(), "relative_threshold = {value}");
    }
  }

  #[test]
  fn test_compressor_from_params() {
    let compressor = SwingCompressor::with_params(&HashMap::new()).unwrap();
    assert_eq!(compressor.min_amplitude(), 0.0);
    assert_eq!(compressor.min_length(), DEFAULT_MIN_SWING_BARS);

    let mut params = HashMap::new();
    params.insert("min_amplitude", 2.5);
    params.insert("min_length", 4.0);
    let compressor = SwingCompressor::with_params(&params).unwrap();
    assert_eq!((compressor.min_amplitude(), compressor.min_length()), (2.5, 4));

    params.insert("min_length", 1.5);
    assert!(SwingCompressor::with_params(&params).is_err());
    assert_eq!(SwingCompressor::filter_name(), "compressor");
    assert_eq!(MinMagnitudeSwingFilter::filter_name(), "min_magnitude");
  }
}

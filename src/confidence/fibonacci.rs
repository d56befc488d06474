//! Fibonacci ratio bands for Elliott waves
//!
//! Each wave is judged by the ratio of its amplitude to a reference wave
//! (wave 2 against wave 1, wave C against wave A and so on). Band checks
//! answer yes/no; proximity scores grade how close the ratio sits to the
//! canonical value.

use serde::{Deserialize, Serialize};

use crate::{num, ElliottSwing, Result, SwingError};

/// Inclusive ratio band with its canonical value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciBand {
    pub lower: f64,
    pub upper: f64,
    pub ideal: f64,
}

impl FibonacciBand {
    pub const fn new(lower: f64, upper: f64, ideal: f64) -> Self {
        Self { lower, upper, ideal }
    }
}

pub const WAVE_TWO_RETRACEMENT: FibonacciBand = FibonacciBand::new(0.382, 0.786, 0.618);
pub const WAVE_THREE_EXTENSION: FibonacciBand = FibonacciBand::new(1.0, 2.618, 1.618);
pub const WAVE_FOUR_RETRACEMENT: FibonacciBand = FibonacciBand::new(0.236, 0.786, 0.382);
pub const WAVE_FIVE_PROJECTION: FibonacciBand = FibonacciBand::new(0.618, 1.618, 1.0);
pub const WAVE_B_RETRACEMENT: FibonacciBand = FibonacciBand::new(0.382, 0.886, 0.618);
pub const WAVE_B_FLAT_RETRACEMENT: FibonacciBand = FibonacciBand::new(0.786, 0.886, 0.786);
pub const WAVE_C_EXTENSION: FibonacciBand = FibonacciBand::new(1.0, 1.618, 1.0);

pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Checks wave amplitude ratios against Fibonacci bands widened by a
/// tolerance on both sides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElliottFibonacciValidator {
    tolerance: f64,
}

impl Default for ElliottFibonacciValidator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ElliottFibonacciValidator {
    pub fn new(tolerance: f64) -> Result<Self> {
        if !num::is_valid(tolerance) {
            return Err(SwingError::InvalidValue("tolerance must be finite"));
        }
        if tolerance < 0.0 {
            return Err(SwingError::OutOfRange {
                field: "tolerance",
                value: tolerance,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    // ===========================================
    // Band checks
    // ===========================================

    pub fn is_wave_two_retracement_valid(
        &self,
        wave1: &ElliottSwing,
        wave2: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave2.amplitude(), wave1.amplitude(), WAVE_TWO_RETRACEMENT)
    }

    pub fn is_wave_three_extension_valid(
        &self,
        wave1: &ElliottSwing,
        wave3: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave3.amplitude(), wave1.amplitude(), WAVE_THREE_EXTENSION)
    }

    pub fn is_wave_four_retracement_valid(
        &self,
        wave3: &ElliottSwing,
        wave4: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave4.amplitude(), wave3.amplitude(), WAVE_FOUR_RETRACEMENT)
    }

    pub fn is_wave_five_projection_valid(
        &self,
        wave1: &ElliottSwing,
        wave5: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave5.amplitude(), wave1.amplitude(), WAVE_FIVE_PROJECTION)
    }

    pub fn is_wave_b_retracement_valid(
        &self,
        wave_a: &ElliottSwing,
        wave_b: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave_b.amplitude(), wave_a.amplitude(), WAVE_B_RETRACEMENT)
    }

    /// Flat corrections retrace deeper: at least 0.786 of wave A
    pub fn is_wave_b_flat_retracement_valid(
        &self,
        wave_a: &ElliottSwing,
        wave_b: &ElliottSwing,
    ) -> bool {
        self.ratio_between(wave_b.amplitude(), wave_a.amplitude(), WAVE_B_FLAT_RETRACEMENT)
    }

    pub fn is_wave_c_extension_valid(&self, wave_a: &ElliottSwing, wave_c: &ElliottSwing) -> bool {
        self.ratio_between(wave_c.amplitude(), wave_a.amplitude(), WAVE_C_EXTENSION)
    }

    // ===========================================
    // Proximity scores
    // ===========================================

    pub fn wave_two_proximity_score(&self, wave1: &ElliottSwing, wave2: &ElliottSwing) -> f64 {
        self.proximity_score(wave2.amplitude(), wave1.amplitude(), WAVE_TWO_RETRACEMENT)
    }

    pub fn wave_three_proximity_score(&self, wave1: &ElliottSwing, wave3: &ElliottSwing) -> f64 {
        self.proximity_score(wave3.amplitude(), wave1.amplitude(), WAVE_THREE_EXTENSION)
    }

    pub fn wave_four_proximity_score(&self, wave3: &ElliottSwing, wave4: &ElliottSwing) -> f64 {
        self.proximity_score(wave4.amplitude(), wave3.amplitude(), WAVE_FOUR_RETRACEMENT)
    }

    pub fn wave_five_proximity_score(&self, wave1: &ElliottSwing, wave5: &ElliottSwing) -> f64 {
        self.proximity_score(wave5.amplitude(), wave1.amplitude(), WAVE_FIVE_PROJECTION)
    }

    pub fn wave_b_proximity_score(&self, wave_a: &ElliottSwing, wave_b: &ElliottSwing) -> f64 {
        self.proximity_score(wave_b.amplitude(), wave_a.amplitude(), WAVE_B_RETRACEMENT)
    }

    pub fn wave_c_proximity_score(&self, wave_a: &ElliottSwing, wave_c: &ElliottSwing) -> f64 {
        self.proximity_score(wave_c.amplitude(), wave_a.amplitude(), WAVE_C_EXTENSION)
    }

    /// Score in [0, 1] for how close `|numerator / denominator|` sits to
    /// `band.ideal`.
    ///
    /// 0 outside the widened band or for invalid/zero inputs. Inside, the
    /// score falls by 0.5 per half band width of distance from the ideal.
    pub fn proximity_score(&self, numerator: f64, denominator: f64, band: FibonacciBand) -> f64 {
        let Some(ratio) = self.ratio_in_band(numerator, denominator, band) else {
            return 0.0;
        };
        let range_half = (band.upper - band.lower) / 2.0;
        if range_half == 0.0 {
            return 1.0;
        }
        let normalized = (ratio - band.ideal).abs() / range_half;
        num::clamp_unit(1.0 - normalized * 0.5)
    }

    fn ratio_between(&self, numerator: f64, denominator: f64, band: FibonacciBand) -> bool {
        self.ratio_in_band(numerator, denominator, band).is_some()
    }

    fn ratio_in_band(&self, numerator: f64, denominator: f64, band: FibonacciBand) -> Option<f64> {
        let ratio = num::safe_ratio(numerator, denominator).abs();
        if !num::is_valid(ratio) {
            return None;
        }
        let lower = band.lower - self.tolerance;
        let upper = band.upper + self.tolerance;
        (ratio >= lower && ratio <= upper).then_some(ratio)
    }
}

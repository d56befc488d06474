//! Fixed-weight Elliott confidence scorer
//!
//! Five category scores combined with constant weights. The factor/profile
//! layer in [`super::profile`] generalizes this; the factors reuse the
//! category computations defined here.

use serde::{Deserialize, Serialize};

use crate::elliott::{ElliottChannel, ElliottPhase};
use crate::{num, ElliottSwing, Result, SwingError};

pub const DEFAULT_FIBONACCI_WEIGHT: f64 = 0.35;
pub const DEFAULT_TIME_WEIGHT: f64 = 0.20;
pub const DEFAULT_ALTERNATION_WEIGHT: f64 = 0.15;
pub const DEFAULT_CHANNEL_WEIGHT: f64 = 0.15;
pub const DEFAULT_COMPLETENESS_WEIGHT: f64 = 0.15;

const NEUTRAL: f64 = 0.5;

/// Result of [`ElliottConfidenceScorer::score`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElliottConfidence {
    pub overall: f64,
    pub fibonacci: f64,
    pub time: f64,
    pub alternation: f64,
    pub channel: f64,
    pub completeness: f64,
    pub primary_reason: String,
}

impl ElliottConfidence {
    pub fn zero() -> Self {
        Self {
            overall: 0.0,
            fibonacci: 0.0,
            time: 0.0,
            alternation: 0.0,
            channel: 0.0,
            completeness: 0.0,
            primary_reason: "No valid structure".to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        num::is_valid(self.overall) && self.overall > 0.0
    }

    pub fn is_above(&self, threshold: f64) -> bool {
        self.is_valid() && self.overall >= threshold
    }
}

/// Wave 2 / wave 4 contrast in depth and duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlternationDiagnostics {
    pub wave2_bars: usize,
    pub wave4_bars: usize,
    /// wave 4 bars / wave 2 bars; `NaN` when wave 2 has no bars
    pub duration_ratio: f64,
    pub depth_difference: f64,
    pub time_difference: f64,
    pub score: f64,
}

impl AlternationDiagnostics {
    pub fn neutral() -> Self {
        Self {
            wave2_bars: 0,
            wave4_bars: 0,
            duration_ratio: f64::NAN,
            depth_difference: 0.0,
            time_difference: 0.0,
            score: NEUTRAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElliottConfidenceScorer {
    fibonacci_weight: f64,
    time_weight: f64,
    alternation_weight: f64,
    channel_weight: f64,
    completeness_weight: f64,
}

impl Default for ElliottConfidenceScorer {
    fn default() -> Self {
        Self {
            fibonacci_weight: DEFAULT_FIBONACCI_WEIGHT,
            time_weight: DEFAULT_TIME_WEIGHT,
            alternation_weight: DEFAULT_ALTERNATION_WEIGHT,
            channel_weight: DEFAULT_CHANNEL_WEIGHT,
            completeness_weight: DEFAULT_COMPLETENESS_WEIGHT,
        }
    }
}

impl ElliottConfidenceScorer {
    pub fn new(
        fibonacci_weight: f64,
        time_weight: f64,
        alternation_weight: f64,
        channel_weight: f64,
        completeness_weight: f64,
    ) -> Result<Self> {
        for weight in [
            fibonacci_weight,
            time_weight,
            alternation_weight,
            channel_weight,
            completeness_weight,
        ] {
            if !num::is_valid(weight) || weight < 0.0 {
                return Err(SwingError::InvalidConfig(format!(
                    "scorer weights must be finite and >= 0, got {weight}"
                )));
            }
        }
        Ok(Self {
            fibonacci_weight,
            time_weight,
            alternation_weight,
            channel_weight,
            completeness_weight,
        })
    }

    /// Weighted confidence of `swings` read as the structure `phase` belongs to
    pub fn score(
        &self,
        swings: &[ElliottSwing],
        phase: ElliottPhase,
        channel: &ElliottChannel,
    ) -> ElliottConfidence {
        if swings.is_empty() || phase == ElliottPhase::None {
            return ElliottConfidence::zero();
        }

        let fibonacci = self.score_fibonacci(swings, phase);
        let time = self.score_time_proportions(swings, phase);
        let alternation = self.score_alternation(swings, phase);
        let channel = self.score_channel(swings, channel);
        let completeness = self.score_completeness(swings, phase);

        let contributions = [
            (fibonacci * self.fibonacci_weight, "Strong Fibonacci conformance"),
            (time * self.time_weight, "Good time proportions"),
            (alternation * self.alternation_weight, "Clear wave alternation"),
            (channel * self.channel_weight, "Strong channel adherence"),
            (completeness * self.completeness_weight, "Complete structure"),
        ];
        let overall = contributions.iter().map(|(c, _)| c).sum();

        // earliest category wins ties
        let mut primary = contributions[0];
        for candidate in &contributions[1..] {
            if candidate.0 > primary.0 {
                primary = *candidate;
            }
        }

        ElliottConfidence {
            overall,
            fibonacci,
            time,
            alternation,
            channel,
            completeness,
            primary_reason: primary.1.to_string(),
        }
    }

    /// Mean ratio score of waves 2-5 for impulse phases, 0 otherwise
    pub fn score_fibonacci(&self, swings: &[ElliottSwing], phase: ElliottPhase) -> f64 {
        if swings.len() < 2 || !phase.is_impulse() {
            return 0.0;
        }

        let ratio = |wave: usize, base: usize| amplitude_ratio(&swings[wave], &swings[base]);
        let mut scores = vec![retracement_score(ratio(1, 0), 0.382, 0.786)];
        if swings.len() >= 3 {
            scores.push(extension_score(ratio(2, 0), 1.0, 2.618, 1.618));
        }
        if swings.len() >= 4 {
            scores.push(retracement_score(ratio(3, 2), 0.236, 0.786));
        }
        if swings.len() >= 5 {
            scores.push(extension_score(ratio(4, 0), 0.618, 1.618, 1.0));
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// Neutral 0.5, +0.25 when wave 3 lasts at least as long as wave 1,
    /// +0.25 when wave 5 lasts 0.5x..1.5x wave 1
    pub fn score_time_proportions(&self, swings: &[ElliottSwing], phase: ElliottPhase) -> f64 {
        if swings.len() < 3 || !phase.is_impulse() {
            return NEUTRAL;
        }

        let mut score = NEUTRAL;
        let wave1 = swings[0].length();
        if swings[2].length() >= wave1 {
            score += 0.25;
        }
        if let Some(wave5) = swings.get(4) {
            let ratio = if wave1 > 0 { wave5.length() as f64 / wave1 as f64 } else { 0.0 };
            if (0.5..=1.5).contains(&ratio) {
                score += 0.25;
            }
        }
        score.min(1.0)
    }

    pub fn alternation_diagnostics(
        &self,
        swings: &[ElliottSwing],
        phase: ElliottPhase,
    ) -> AlternationDiagnostics {
        if swings.len() < 4 || !phase.is_impulse() {
            return AlternationDiagnostics::neutral();
        }

        let (wave2, wave4) = (&swings[1], &swings[3]);
        let wave2_depth = amplitude_ratio(wave2, &swings[0]);
        let wave4_depth = amplitude_ratio(wave4, &swings[2]);
        let depth_difference = (wave2_depth - wave4_depth).abs();

        let wave2_bars = wave2.length();
        let wave4_bars = wave4.length();
        let longest = wave2_bars.max(wave4_bars);
        let time_difference = if longest > 0 {
            wave2_bars.abs_diff(wave4_bars) as f64 / longest as f64
        } else {
            0.0
        };
        let duration_ratio = if wave2_bars > 0 {
            wave4_bars as f64 / wave2_bars as f64
        } else {
            f64::NAN
        };

        let depth_score = (depth_difference * 2.0).min(1.0);
        let time_score = time_difference.min(1.0);
        AlternationDiagnostics {
            wave2_bars,
            wave4_bars,
            duration_ratio,
            depth_difference,
            time_difference,
            score: (depth_score + time_score) / 2.0,
        }
    }

    pub fn score_alternation(&self, swings: &[ElliottSwing], phase: ElliottPhase) -> f64 {
        self.alternation_diagnostics(swings, phase).score
    }

    /// Fraction of swing endpoints inside the channel; neutral without one
    pub fn score_channel(&self, swings: &[ElliottSwing], channel: &ElliottChannel) -> f64 {
        let (within, total) = channel_hits(swings, channel);
        if total == 0 || !channel.is_valid() {
            return NEUTRAL;
        }
        within as f64 / total as f64
    }

    pub fn score_completeness(&self, swings: &[ElliottSwing], phase: ElliottPhase) -> f64 {
        if swings.is_empty() {
            return 0.0;
        }
        let Some(expected) = expected_waves(phase) else {
            return 0.0;
        };
        let completeness = (swings.len() as f64 / expected as f64).min(1.0);
        if phase.completes_structure() {
            (completeness + 0.1).min(1.0)
        } else {
            completeness
        }
    }
}

/// Swing count that completes the structure `phase` belongs to
pub(crate) fn expected_waves(phase: ElliottPhase) -> Option<usize> {
    if phase.is_impulse() {
        Some(5)
    } else if phase.is_corrective() {
        Some(3)
    } else {
        None
    }
}

/// Endpoints inside a channel (zero tolerance) and endpoints checked
pub(crate) fn channel_hits(swings: &[ElliottSwing], channel: &ElliottChannel) -> (usize, usize) {
    let within = swings
        .iter()
        .flat_map(|s| [s.from_price, s.to_price])
        .filter(|&price| channel.contains(price, 0.0))
        .count();
    (within, swings.len() * 2)
}

/// `numerator.amplitude / denominator.amplitude`, 0 unless the denominator
/// amplitude is positive
fn amplitude_ratio(numerator: &ElliottSwing, denominator: &ElliottSwing) -> f64 {
    let den = denominator.amplitude();
    if num::is_valid(den) && den > 0.0 {
        numerator.amplitude() / den
    } else {
        0.0
    }
}

/// 1 inside `[min, max]`, linear partial credit down to 0.8*min and up to
/// 1.2*max, 0 beyond
fn retracement_score(ratio: f64, min: f64, max: f64) -> f64 {
    if !num::is_valid(ratio) || ratio < min * 0.8 || ratio > max * 1.2 {
        return 0.0;
    }
    if ratio >= min && ratio <= max {
        return 1.0;
    }
    let score = if ratio < min {
        1.0 - (min - ratio) / min
    } else {
        1.0 - (ratio - max) / max
    };
    score.max(0.0)
}

/// 0.7 base inside `[min, max]` (scaled down in the 0.8*min / 1.2*max
/// margins) plus up to 0.3 for closeness to `ideal`
fn extension_score(ratio: f64, min: f64, max: f64, ideal: f64) -> f64 {
    let lower_bound = min * 0.8;
    let upper_bound = max * 1.2;
    if !num::is_valid(ratio) || ratio < lower_bound || ratio > upper_bound {
        return 0.0;
    }
    let base = if ratio < min {
        0.7 * ((ratio - lower_bound) / (min - lower_bound)).max(0.0)
    } else if ratio > max {
        0.7 * ((upper_bound - ratio) / (upper_bound - max)).max(0.0)
    } else {
        0.7
    };
    let bonus = 0.3 * (1.0 - (ratio - ideal).abs() / ideal).max(0.0);
    (base + bonus).min(1.0)
}

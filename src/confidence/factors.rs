//! Builtin confidence factors

use super::scorer::{channel_hits, expected_waves, ElliottConfidenceScorer};
use super::{ConfidenceFactor, ConfidenceFactorResult, ElliottConfidenceContext, FactorCategory};

const NEUTRAL: f64 = 0.5;

// ============================================================
// FIBONACCI
// ============================================================

/// Mean Fibonacci proximity of the waves present.
///
/// Impulse phases grade waves 2-5 against waves 1 and 3; corrective phases
/// grade B and C against A. No computable ratio scores 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FibonacciRelationshipFactor;

impl ConfidenceFactor for FibonacciRelationshipFactor {
    fn name(&self) -> &str {
        "fibonacci_relationship"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Fibonacci
    }

    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
        let swings = context.swings;
        let validator = context.fibonacci_validator;
        let mut ratios: Vec<(&str, f64)> = Vec::with_capacity(4);

        if context.phase.is_impulse() {
            if swings.len() >= 2 {
                let score = validator.wave_two_proximity_score(&swings[0], &swings[1]);
                ratios.push(("wave2_proximity", score));
            }
            if swings.len() >= 3 {
                let score = validator.wave_three_proximity_score(&swings[0], &swings[2]);
                ratios.push(("wave3_proximity", score));
            }
            if swings.len() >= 4 {
                let score = validator.wave_four_proximity_score(&swings[2], &swings[3]);
                ratios.push(("wave4_proximity", score));
            }
            if swings.len() >= 5 {
                let score = validator.wave_five_proximity_score(&swings[0], &swings[4]);
                ratios.push(("wave5_proximity", score));
            }
        } else if context.phase.is_corrective() {
            if swings.len() >= 2 {
                let score = validator.wave_b_proximity_score(&swings[0], &swings[1]);
                ratios.push(("wave_b_proximity", score));
            }
            if swings.len() >= 3 {
                let score = validator.wave_c_proximity_score(&swings[0], &swings[2]);
                ratios.push(("wave_c_proximity", score));
            }
        }

        if ratios.is_empty() {
            return ConfidenceFactorResult::new(
                self.name(),
                self.category(),
                0.0,
                "No Fibonacci ratio computable",
            );
        }

        let score = ratios.iter().map(|(_, s)| s).sum::<f64>() / ratios.len() as f64;
        let summary = format!("Fibonacci proximity {:.2} over {} ratios", score, ratios.len());
        let result = ConfidenceFactorResult::new(self.name(), self.category(), score, summary);
        ratios
            .into_iter()
            .fold(result, |result, (key, value)| result.with_diagnostic(key, value))
    }
}

// ============================================================
// TIME
// ============================================================

/// Relative durations of waves 1, 3 and 5
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeProportionFactor {
    scorer: ElliottConfidenceScorer,
}

impl TimeProportionFactor {
    pub fn new(scorer: ElliottConfidenceScorer) -> Self {
        Self { scorer }
    }
}

impl ConfidenceFactor for TimeProportionFactor {
    fn name(&self) -> &str {
        "time_proportion"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Time
    }

    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
        let swings = context.swings;
        let score = self.scorer.score_time_proportions(swings, context.phase);
        let summary = if swings.len() < 3 || !context.phase.is_impulse() {
            "Time proportions neutral: needs three impulse waves".to_string()
        } else {
            format!("Time proportion score {score:.2}")
        };

        let mut result = ConfidenceFactorResult::new(self.name(), self.category(), score, summary);
        for (key, wave) in [("wave1_bars", 0), ("wave3_bars", 2), ("wave5_bars", 4)] {
            if let Some(swing) = swings.get(wave) {
                result = result.with_diagnostic(key, swing.length() as f64);
            }
        }
        result
    }
}

/// Contrast between waves 2 and 4 in depth and duration
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeAlternationFactor {
    scorer: ElliottConfidenceScorer,
}

impl TimeAlternationFactor {
    pub fn new(scorer: ElliottConfidenceScorer) -> Self {
        Self { scorer }
    }
}

impl ConfidenceFactor for TimeAlternationFactor {
    fn name(&self) -> &str {
        "time_alternation"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Alternation
    }

    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
        let diagnostics = self.scorer.alternation_diagnostics(context.swings, context.phase);
        let summary = if context.swings.len() < 4 || !context.phase.is_impulse() {
            "Alternation neutral: needs waves 2 and 4".to_string()
        } else {
            format!("Wave 2/4 alternation {:.2}", diagnostics.score)
        };

        ConfidenceFactorResult::new(self.name(), self.category(), diagnostics.score, summary)
            .with_diagnostic("wave2_bars", diagnostics.wave2_bars as f64)
            .with_diagnostic("wave4_bars", diagnostics.wave4_bars as f64)
            .with_diagnostic("duration_ratio", diagnostics.duration_ratio)
            .with_diagnostic("depth_difference", diagnostics.depth_difference)
            .with_diagnostic("time_difference", diagnostics.time_difference)
    }
}

// ============================================================
// CHANNEL
// ============================================================

/// Share of swing endpoints inside the projected channel
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelAdherenceFactor;

impl ConfidenceFactor for ChannelAdherenceFactor {
    fn name(&self) -> &str {
        "channel_adherence"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Channel
    }

    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
        let (within, total) = channel_hits(context.swings, &context.channel);
        let (score, summary) = if !context.channel.is_valid() || total == 0 {
            (NEUTRAL, "Channel neutral: no valid channel".to_string())
        } else {
            let score = within as f64 / total as f64;
            (score, format!("{within} of {total} swing points inside channel"))
        };

        ConfidenceFactorResult::new(self.name(), self.category(), score, summary)
            .with_diagnostic("points_within", within as f64)
            .with_diagnostic("total_points", total as f64)
    }
}

// ============================================================
// COMPLETENESS
// ============================================================

/// How much of the expected wave count is present
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureCompletenessFactor {
    scorer: ElliottConfidenceScorer,
}

impl StructureCompletenessFactor {
    pub fn new(scorer: ElliottConfidenceScorer) -> Self {
        Self { scorer }
    }
}

impl ConfidenceFactor for StructureCompletenessFactor {
    fn name(&self) -> &str {
        "structure_completeness"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Completeness
    }

    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
        let actual = context.swings.len();
        let expected = expected_waves(context.phase).unwrap_or(0);
        let score = self.scorer.score_completeness(context.swings, context.phase);
        let summary = if expected == 0 {
            "No structure expected for this phase".to_string()
        } else {
            format!("{actual} of {expected} waves present")
        };

        ConfidenceFactorResult::new(self.name(), self.category(), score, summary)
            .with_diagnostic("actual_waves", actual as f64)
            .with_diagnostic("expected_waves", expected as f64)
    }
}

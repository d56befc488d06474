//! Weighted factor profiles and scenario-aware confidence models

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    ChannelAdherenceFactor, ConfidenceFactor, ConfidenceFactorResult, ElliottConfidenceContext,
    ElliottFibonacciValidator, FactorCategory, FibonacciRelationshipFactor,
    StructureCompletenessFactor, TimeAlternationFactor, TimeProportionFactor,
};
use crate::elliott::{ElliottChannel, ElliottPhase, ScenarioType};
use crate::{num, ElliottSwing, Result, SwingError};

// ============================================================
// BREAKDOWN
// ============================================================

/// Aggregated confidence with per-category sub-scores and every factor's
/// individual result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElliottConfidenceBreakdown {
    pub overall: f64,
    pub fibonacci: f64,
    pub time: f64,
    pub alternation: f64,
    pub channel: f64,
    pub completeness: f64,
    pub reason: String,
    pub factor_results: Vec<ConfidenceFactorResult>,
}

impl ElliottConfidenceBreakdown {
    fn insufficient() -> Self {
        Self {
            overall: 0.0,
            fibonacci: 0.0,
            time: 0.0,
            alternation: 0.0,
            channel: 0.0,
            completeness: 0.0,
            reason: "Insufficient data".to_string(),
            factor_results: Vec::new(),
        }
    }

    pub fn category_score(&self, category: FactorCategory) -> f64 {
        match category {
            FactorCategory::Fibonacci => self.fibonacci,
            FactorCategory::Time => self.time,
            FactorCategory::Alternation => self.alternation,
            FactorCategory::Channel => self.channel,
            FactorCategory::Completeness => self.completeness,
        }
    }

    pub fn factor(&self, name: &str) -> Option<&ConfidenceFactorResult> {
        self.factor_results.iter().find(|r| r.name == name)
    }
}

// ============================================================
// PROFILE
// ============================================================

/// A factor with its aggregation weight
#[derive(Clone)]
pub struct WeightedFactor {
    factor: Arc<dyn ConfidenceFactor>,
    weight: f64,
}

impl WeightedFactor {
    /// `weight` must be finite and >= 0
    pub fn new<F: ConfidenceFactor + 'static>(factor: F, weight: f64) -> Result<Self> {
        if !num::is_valid(weight) || weight < 0.0 {
            return Err(SwingError::InvalidConfig(format!(
                "factor '{}' weight must be finite and >= 0, got {weight}",
                factor.name()
            )));
        }
        Ok(Self {
            factor: Arc::new(factor),
            weight,
        })
    }

    pub fn factor(&self) -> &dyn ConfidenceFactor {
        self.factor.as_ref()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl fmt::Debug for WeightedFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedFactor")
            .field("factor", &self.factor.name())
            .field("category", &self.factor.category())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Ordered, immutable set of weighted factors
#[derive(Debug, Clone, Default)]
pub struct ConfidenceProfile {
    factors: Vec<WeightedFactor>,
}

impl ConfidenceProfile {
    pub fn new(factors: Vec<WeightedFactor>) -> Self {
        Self { factors }
    }

    /// Append a factor, validating its weight
    pub fn with<F: ConfidenceFactor + 'static>(mut self, factor: F, weight: f64) -> Result<Self> {
        self.factors.push(WeightedFactor::new(factor, weight)?);
        Ok(self)
    }

    pub fn factors(&self) -> &[WeightedFactor] {
        &self.factors
    }

    pub fn total_weight(&self) -> f64 {
        self.factors.iter().map(WeightedFactor::weight).sum()
    }

    /// Run every factor and aggregate.
    ///
    /// Undefined factor scores count as 0 but keep their weight; defined
    /// scores are clamped to [0, 1] before weighting. The reason comes from
    /// the factor with the largest weighted contribution (earliest on ties).
    pub fn score(&self, context: &ElliottConfidenceContext<'_>) -> ElliottConfidenceBreakdown {
        if self.factors.is_empty() {
            return ElliottConfidenceBreakdown::insufficient();
        }

        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut categories = [(0.0_f64, 0.0_f64); 5];
        let mut top: Option<(f64, usize)> = None;
        let mut results = Vec::with_capacity(self.factors.len());

        for (i, weighted) in self.factors.iter().enumerate() {
            let result = weighted.factor.score(context).with_weight(weighted.weight);
            let contribution = result.effective_score() * weighted.weight;

            weighted_sum += contribution;
            weight_sum += weighted.weight;
            let slot = &mut categories[result.category.slot()];
            slot.0 += contribution;
            slot.1 += weighted.weight;

            if top.map_or(true, |(best, _)| contribution > best) {
                top = Some((contribution, i));
            }
            results.push(result);
        }

        let overall = if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            tracing::warn!(factors = results.len(), "confidence profile has zero total weight");
            0.0
        };
        let category = |c: FactorCategory| {
            let (sum, weight) = categories[c.slot()];
            if weight > 0.0 {
                sum / weight
            } else {
                0.0
            }
        };

        let reason = top
            .map(|(_, i)| &results[i])
            .map(|r| if r.summary.trim().is_empty() { r.name.clone() } else { r.summary.clone() })
            .unwrap_or_else(|| "Insufficient data".to_string());

        let breakdown = ElliottConfidenceBreakdown {
            overall: num::clamp_unit(overall),
            fibonacci: category(FactorCategory::Fibonacci),
            time: category(FactorCategory::Time),
            alternation: category(FactorCategory::Alternation),
            channel: category(FactorCategory::Channel),
            completeness: category(FactorCategory::Completeness),
            reason,
            factor_results: results,
        };
        tracing::debug!(
            overall = breakdown.overall,
            reason = %breakdown.reason,
            factors = breakdown.factor_results.len(),
            "confidence breakdown"
        );
        breakdown
    }
}

// ============================================================
// MODELS
// ============================================================

/// Scores a swing sequence into a breakdown. Missing inputs are normalized:
/// no phase is [`ElliottPhase::None`], no channel is an invalid channel, no
/// scenario type is [`ScenarioType::Unknown`].
pub trait ConfidenceModel: Send + Sync {
    fn score(
        &self,
        swings: &[ElliottSwing],
        phase: Option<ElliottPhase>,
        channel: Option<&ElliottChannel>,
        scenario_type: Option<ScenarioType>,
    ) -> ElliottConfidenceBreakdown;
}

impl ConfidenceModel for ConfidenceProfile {
    fn score(
        &self,
        swings: &[ElliottSwing],
        phase: Option<ElliottPhase>,
        channel: Option<&ElliottChannel>,
        scenario_type: Option<ScenarioType>,
    ) -> ElliottConfidenceBreakdown {
        let validator = ElliottFibonacciValidator::default();
        let context = ElliottConfidenceContext::new(
            swings,
            phase.unwrap_or_default(),
            channel.copied().unwrap_or_else(ElliottChannel::invalid),
            &validator,
        )
        .with_scenario_type(scenario_type.unwrap_or_default());
        ConfidenceProfile::score(self, &context)
    }
}

/// Picks a profile per scenario type, falling back to a default
#[derive(Debug, Clone)]
pub struct ScenarioTypeConfidenceModel {
    default_profile: ConfidenceProfile,
    overrides: BTreeMap<ScenarioType, ConfidenceProfile>,
    fibonacci_validator: ElliottFibonacciValidator,
}

impl ScenarioTypeConfidenceModel {
    pub fn builder() -> ScenarioTypeConfidenceModelBuilder {
        ScenarioTypeConfidenceModelBuilder::default()
    }

    /// Profile applied to `scenario_type`
    pub fn profile(&self, scenario_type: ScenarioType) -> &ConfidenceProfile {
        self.overrides.get(&scenario_type).unwrap_or(&self.default_profile)
    }
}

impl ConfidenceModel for ScenarioTypeConfidenceModel {
    fn score(
        &self,
        swings: &[ElliottSwing],
        phase: Option<ElliottPhase>,
        channel: Option<&ElliottChannel>,
        scenario_type: Option<ScenarioType>,
    ) -> ElliottConfidenceBreakdown {
        let scenario_type = scenario_type.unwrap_or_default();
        let context = ElliottConfidenceContext::new(
            swings,
            phase.unwrap_or_default(),
            channel.copied().unwrap_or_else(ElliottChannel::invalid),
            &self.fibonacci_validator,
        )
        .with_scenario_type(scenario_type);
        self.profile(scenario_type).score(&context)
    }
}

/// Builder for [`ScenarioTypeConfidenceModel`]
#[derive(Debug, Clone, Default)]
pub struct ScenarioTypeConfidenceModelBuilder {
    default_profile: Option<ConfidenceProfile>,
    overrides: BTreeMap<ScenarioType, ConfidenceProfile>,
    fibonacci_validator: ElliottFibonacciValidator,
}

impl ScenarioTypeConfidenceModelBuilder {
    pub fn default_profile(mut self, profile: ConfidenceProfile) -> Self {
        self.default_profile = Some(profile);
        self
    }

    pub fn profile_for(mut self, scenario_type: ScenarioType, profile: ConfidenceProfile) -> Self {
        self.overrides.insert(scenario_type, profile);
        self
    }

    pub fn fibonacci_validator(mut self, validator: ElliottFibonacciValidator) -> Self {
        self.fibonacci_validator = validator;
        self
    }

    /// Without an explicit default, [`ConfidenceProfiles::default_profile`]
    /// is used.
    pub fn build(self) -> ScenarioTypeConfidenceModel {
        ScenarioTypeConfidenceModel {
            default_profile: self
                .default_profile
                .unwrap_or_else(ConfidenceProfiles::default_profile),
            overrides: self.overrides,
            fibonacci_validator: self.fibonacci_validator,
        }
    }
}

// ============================================================
// PRESETS
// ============================================================

/// Ready-made profiles and models
pub struct ConfidenceProfiles;

impl ConfidenceProfiles {
    /// Fibonacci 0.35, time 0.20, alternation 0.15, channel 0.15,
    /// completeness 0.15
    pub fn default_profile() -> ConfidenceProfile {
        Self::weighted(0.35, 0.20, 0.15, 0.15, 0.15)
    }

    /// Corrective waves carry no time/alternation rules, so ratios, channel
    /// and wave count dominate
    pub fn corrective_profile() -> ConfidenceProfile {
        Self::weighted(0.40, 0.10, 0.05, 0.20, 0.25)
    }

    /// Fibonacci-heavy weighting for high-reward impulse setups
    pub fn high_reward_profile() -> ConfidenceProfile {
        Self::weighted(0.40, 0.20, 0.20, 0.10, 0.10)
    }

    /// Default profile, corrective profile for every corrective scenario type
    pub fn default_model() -> ScenarioTypeConfidenceModel {
        let corrective = Self::corrective_profile();
        [
            ScenarioType::CorrectiveZigzag,
            ScenarioType::CorrectiveFlat,
            ScenarioType::CorrectiveTriangle,
            ScenarioType::CorrectiveComplex,
        ]
        .into_iter()
        .fold(
            ScenarioTypeConfidenceModel::builder().default_profile(Self::default_profile()),
            |builder, scenario| builder.profile_for(scenario, corrective.clone()),
        )
        .build()
    }

    fn weighted(
        fibonacci: f64,
        time: f64,
        alternation: f64,
        channel: f64,
        completeness: f64,
    ) -> ConfidenceProfile {
        ConfidenceProfile::new(vec![
            WeightedFactor {
                factor: Arc::new(FibonacciRelationshipFactor),
                weight: fibonacci,
            },
            WeightedFactor {
                factor: Arc::new(TimeProportionFactor::default()),
                weight: time,
            },
            WeightedFactor {
                factor: Arc::new(TimeAlternationFactor::default()),
                weight: alternation,
            },
            WeightedFactor {
                factor: Arc::new(ChannelAdherenceFactor),
                weight: channel,
            },
            WeightedFactor {
                factor: Arc::new(StructureCompletenessFactor::default()),
                weight: completeness,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElliottDegree;

    struct Fixed {
        name: &'static str,
        category: FactorCategory,
        score: f64,
    }

    impl ConfidenceFactor for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn category(&self) -> FactorCategory {
            self.category
        }

        fn score(&self, _context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
            let summary = format!("{} fixed", self.name);
            ConfidenceFactorResult::new(self.name, self.category, self.score, summary)
        }
    }

    fn fixed(name: &'static str, category: FactorCategory, score: f64) -> Fixed {
        Fixed { name, category, score }
    }

    fn swings() -> Vec<ElliottSwing> {
        vec![
            ElliottSwing::new(0, 5, 100.0, 110.0, ElliottDegree::Minor),
            ElliottSwing::new(5, 8, 110.0, 103.82, ElliottDegree::Minor),
            ElliottSwing::new(8, 16, 103.82, 120.0, ElliottDegree::Minor),
        ]
    }

    #[test]
    fn test_weighted_average() {
        let profile = ConfidenceProfile::default()
            .with(fixed("a", FactorCategory::Fibonacci, 1.0), 0.4)
            .and_then(|p| p.with(fixed("b", FactorCategory::Time, 0.5), 0.3))
            .and_then(|p| p.with(fixed("c", FactorCategory::Alternation, 0.0), 0.1))
            .and_then(|p| p.with(fixed("d", FactorCategory::Channel, 0.0), 0.1))
            .and_then(|p| p.with(fixed("e", FactorCategory::Completeness, 0.0), 0.1))
            .unwrap();

        let phase = Some(ElliottPhase::Wave3);
        let breakdown = ConfidenceModel::score(&profile, &swings(), phase, None, None);
        assert!((breakdown.overall - 0.55).abs() < 1e-12);
        assert_eq!(breakdown.fibonacci, 1.0);
        assert_eq!(breakdown.time, 0.5);
        assert_eq!(breakdown.reason, "a fixed");
        assert_eq!(breakdown.factor_results.len(), 5);
        assert_eq!(breakdown.factor_results[1].weight, 0.3);
    }

    #[test]
    fn test_empty_profile_is_insufficient() {
        let profile = ConfidenceProfile::default();
        let breakdown = ConfidenceModel::score(&profile, &swings(), None, None, None);
        assert_eq!(breakdown.overall, 0.0);
        assert_eq!(breakdown.reason, "Insufficient data");
    }

    #[test]
    fn test_zero_weights_give_zero() {
        let profile = ConfidenceProfile::default()
            .with(fixed("a", FactorCategory::Fibonacci, 1.0), 0.0)
            .unwrap();
        let breakdown = ConfidenceModel::score(&profile, &swings(), None, None, None);
        assert_eq!(breakdown.overall, 0.0);
        assert_eq!(breakdown.fibonacci, 0.0);
    }

    #[test]
    fn test_undefined_and_out_of_range_scores() {
        let profile = ConfidenceProfile::default()
            .with(fixed("nan", FactorCategory::Fibonacci, f64::NAN), 1.0)
            .and_then(|p| p.with(fixed("big", FactorCategory::Time, 3.0), 1.0))
            .unwrap();
        let breakdown = ConfidenceModel::score(&profile, &swings(), None, None, None);
        assert!((breakdown.overall - 0.5).abs() < 1e-12);
        assert_eq!(breakdown.time, 1.0);
        assert_eq!(breakdown.reason, "big fixed");
    }

    #[test]
    fn test_blank_summary_falls_back_to_name() {
        struct Quiet;
        impl ConfidenceFactor for Quiet {
            fn name(&self) -> &str {
                "quiet"
            }
            fn category(&self) -> FactorCategory {
                FactorCategory::Channel
            }
            fn score(&self, _context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult {
                ConfidenceFactorResult::new("quiet", FactorCategory::Channel, 0.9, "  ")
            }
        }
        let profile = ConfidenceProfile::default().with(Quiet, 1.0).unwrap();
        let breakdown = ConfidenceModel::score(&profile, &swings(), None, None, None);
        assert_eq!(breakdown.reason, "quiet");
    }

    #[test]
    fn test_invalid_weight_rejected() {
        assert!(WeightedFactor::new(FibonacciRelationshipFactor, -0.1).is_err());
        assert!(WeightedFactor::new(FibonacciRelationshipFactor, f64::INFINITY).is_err());
    }

    #[test]
    fn test_scenario_model_picks_override() {
        let only_channel = ConfidenceProfile::default().with(ChannelAdherenceFactor, 1.0).unwrap();
        let model = ScenarioTypeConfidenceModel::builder()
            .profile_for(ScenarioType::CorrectiveFlat, only_channel)
            .build();

        let flat = model.score(
            &swings(),
            Some(ElliottPhase::CorrectiveC),
            None,
            Some(ScenarioType::CorrectiveFlat),
        );
        assert_eq!(flat.factor_results.len(), 1);
        assert_eq!(flat.overall, 0.5);

        let fallback = model.score(&swings(), Some(ElliottPhase::Wave3), None, None);
        assert_eq!(fallback.factor_results.len(), 5);
    }

    #[test]
    fn test_default_model_profiles() {
        let model = ConfidenceProfiles::default_model();
        assert!((model.profile(ScenarioType::Impulse).total_weight() - 1.0).abs() < 1e-12);
        assert!((model.profile(ScenarioType::CorrectiveZigzag).total_weight() - 1.0).abs() < 1e-12);
        assert_eq!(model.profile(ScenarioType::CorrectiveTriangle).factors()[0].weight(), 0.40);
        assert_eq!(model.profile(ScenarioType::Unknown).factors()[0].weight(), 0.35);
    }
}

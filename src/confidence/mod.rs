//! Elliott-wave confidence scoring
//!
//! Pluggable [`ConfidenceFactor`]s each grade one aspect of a swing sequence.
//! A [`ConfidenceProfile`] weights them into an
//! [`ElliottConfidenceBreakdown`], and a [`ConfidenceModel`] picks the profile
//! for a scenario type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elliott::{ElliottChannel, ElliottPhase, ScenarioType};
use crate::{num, ElliottSwing};

pub mod factors;
pub mod fibonacci;
pub mod profile;
pub mod scorer;

pub use factors::*;
pub use fibonacci::{ElliottFibonacciValidator, FibonacciBand};
pub use profile::*;
pub use scorer::{AlternationDiagnostics, ElliottConfidence, ElliottConfidenceScorer};

// ============================================================
// FACTOR TYPES
// ============================================================

/// Aspect of wave structure a factor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactorCategory {
    Fibonacci,
    Time,
    Alternation,
    Channel,
    Completeness,
}

impl FactorCategory {
    pub const ALL: [FactorCategory; 5] = [
        FactorCategory::Fibonacci,
        FactorCategory::Time,
        FactorCategory::Alternation,
        FactorCategory::Channel,
        FactorCategory::Completeness,
    ];

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// One factor's verdict. `score` is in [0, 1] or `NaN` when undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactorResult {
    pub name: String,
    pub category: FactorCategory,
    pub score: f64,
    pub weight: f64,
    pub diagnostics: BTreeMap<String, f64>,
    pub summary: String,
}

impl ConfidenceFactorResult {
    pub fn new(
        name: impl Into<String>,
        category: FactorCategory,
        score: f64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            score,
            weight: 0.0,
            diagnostics: BTreeMap::new(),
            summary: summary.into(),
        }
    }

    pub fn with_diagnostic(mut self, key: impl Into<String>, value: f64) -> Self {
        self.diagnostics.insert(key.into(), value);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        num::is_valid(self.score)
    }

    /// Score used for aggregation: clamped to [0, 1], undefined counts as 0
    #[inline]
    pub fn effective_score(&self) -> f64 {
        num::clamp_unit(self.score)
    }
}

/// Inputs shared by every factor in one scoring call
#[derive(Debug, Clone, Copy)]
pub struct ElliottConfidenceContext<'a> {
    pub swings: &'a [ElliottSwing],
    pub phase: ElliottPhase,
    pub channel: ElliottChannel,
    pub scenario_type: ScenarioType,
    pub fibonacci_validator: &'a ElliottFibonacciValidator,
}

impl<'a> ElliottConfidenceContext<'a> {
    pub fn new(
        swings: &'a [ElliottSwing],
        phase: ElliottPhase,
        channel: ElliottChannel,
        fibonacci_validator: &'a ElliottFibonacciValidator,
    ) -> Self {
        Self {
            swings,
            phase,
            channel,
            scenario_type: ScenarioType::Unknown,
            fibonacci_validator,
        }
    }

    pub fn with_scenario_type(mut self, scenario_type: ScenarioType) -> Self {
        self.scenario_type = scenario_type;
        self
    }
}

/// Grades one aspect of a swing sequence. Never fails: missing data yields a
/// neutral score and a summary saying so.
pub trait ConfidenceFactor: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> FactorCategory;
    fn score(&self, context: &ElliottConfidenceContext<'_>) -> ConfidenceFactorResult;
}

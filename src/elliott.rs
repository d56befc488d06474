//! Elliott-wave vocabulary: degrees, phases, scenario types and price channels

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{num, ElliottSwing, Result, SwingError};

// ============================================================
// DEGREE
// ============================================================

/// Wave degree, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElliottDegree {
    GrandSupercycle,
    Supercycle,
    Cycle,
    Primary,
    Intermediate,
    Minor,
    Minute,
    Minuette,
    SubMinuette,
}

/// Typical history span per degree in days, `(min, max)`; max 0 is open-ended
const RECOMMENDED_DAYS: [(f64, f64); 9] = [
    (20000.0, 0.0),
    (7000.0, 20000.0),
    (1000.0, 7000.0),
    (400.0, 1000.0),
    (180.0, 400.0),
    (60.0, 180.0),
    (30.0, 90.0),
    (7.0, 30.0),
    (2.0, 7.0),
];

const MIN_RECOMMENDATION_SCORE: f64 = 0.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

impl ElliottDegree {
    pub const ALL: [ElliottDegree; 9] = [
        ElliottDegree::GrandSupercycle,
        ElliottDegree::Supercycle,
        ElliottDegree::Cycle,
        ElliottDegree::Primary,
        ElliottDegree::Intermediate,
        ElliottDegree::Minor,
        ElliottDegree::Minute,
        ElliottDegree::Minuette,
        ElliottDegree::SubMinuette,
    ];

    /// Position in [`ElliottDegree::ALL`]; 0 is the largest degree
    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Next larger degree, saturating at `GrandSupercycle`
    pub fn higher_degree(self) -> Self {
        match self.ordinal() {
            0 => self,
            n => Self::ALL[n - 1],
        }
    }

    /// Next smaller degree, saturating at `SubMinuette`
    pub fn lower_degree(self) -> Self {
        Self::ALL.get(self.ordinal() + 1).copied().unwrap_or(self)
    }

    #[inline]
    pub fn is_higher_or_equal(self, other: ElliottDegree) -> bool {
        self.ordinal() <= other.ordinal()
    }

    #[inline]
    pub fn is_lower_or_equal(self, other: ElliottDegree) -> bool {
        self.ordinal() >= other.ordinal()
    }

    /// Degrees whose usual time span fits `bar_count` bars of `bar_duration`,
    /// best fit first.
    ///
    /// When no degree scores at least 0.5, the single best candidate is
    /// returned instead.
    pub fn recommended_degrees(
        bar_duration: Duration,
        bar_count: usize,
    ) -> Result<Vec<ElliottDegree>> {
        if bar_count == 0 {
            return Err(SwingError::InvalidValue("bar count must be positive"));
        }
        if bar_duration.is_zero() {
            return Err(SwingError::InvalidValue("bar duration must be positive"));
        }

        let total_days = bar_duration.as_secs_f64() / SECONDS_PER_DAY * bar_count as f64;
        let minimum = Self::minimum_degree_for(bar_duration);

        let mut candidates: Vec<(ElliottDegree, f64, f64)> = Self::ALL
            .iter()
            .copied()
            .filter(|degree| degree.is_higher_or_equal(minimum))
            .map(|degree| {
                let (min_days, max_days) = RECOMMENDED_DAYS[degree.ordinal()];
                (
                    degree,
                    range_score(min_days, max_days, total_days),
                    midpoint_distance(min_days, max_days, total_days),
                )
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.2.total_cmp(&b.2))
                .then_with(|| a.0.cmp(&b.0))
        });

        let passing: Vec<ElliottDegree> = candidates
            .iter()
            .filter(|(_, score, _)| *score >= MIN_RECOMMENDATION_SCORE)
            .map(|(degree, _, _)| *degree)
            .collect();

        if !passing.is_empty() {
            return Ok(passing);
        }
        Ok(candidates.first().map(|(degree, _, _)| vec![*degree]).unwrap_or_default())
    }

    fn minimum_degree_for(bar_duration: Duration) -> ElliottDegree {
        const HOUR: u64 = 3_600;
        const DAY: u64 = 24 * HOUR;

        let secs = bar_duration.as_secs();
        if secs >= 7 * DAY {
            ElliottDegree::Intermediate
        } else if secs >= DAY {
            ElliottDegree::Minute
        } else if bar_duration > Duration::from_secs(15 * 60) {
            ElliottDegree::Minuette
        } else {
            ElliottDegree::SubMinuette
        }
    }
}

fn range_score(min_days: f64, max_days: f64, total_days: f64) -> f64 {
    if total_days < min_days {
        total_days / min_days
    } else if max_days > 0.0 && total_days > max_days {
        max_days / total_days
    } else {
        1.0
    }
}

fn midpoint_distance(min_days: f64, max_days: f64, total_days: f64) -> f64 {
    if total_days < min_days {
        min_days - total_days
    } else if max_days <= 0.0 {
        0.0
    } else if total_days > max_days {
        total_days - max_days
    } else {
        (total_days - (min_days + max_days) / 2.0).abs()
    }
}

// ============================================================
// PHASE & SCENARIO TYPE
// ============================================================

/// Position inside a wave structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElliottPhase {
    #[default]
    None,
    Wave1,
    Wave2,
    Wave3,
    Wave4,
    Wave5,
    CorrectiveA,
    CorrectiveB,
    CorrectiveC,
}

impl ElliottPhase {
    #[inline]
    pub fn is_impulse(self) -> bool {
        matches!(
            self,
            ElliottPhase::Wave1
                | ElliottPhase::Wave2
                | ElliottPhase::Wave3
                | ElliottPhase::Wave4
                | ElliottPhase::Wave5
        )
    }

    #[inline]
    pub fn is_corrective(self) -> bool {
        matches!(
            self,
            ElliottPhase::CorrectiveA | ElliottPhase::CorrectiveB | ElliottPhase::CorrectiveC
        )
    }

    /// Wave 5 and wave C close their structures
    #[inline]
    pub fn completes_structure(self) -> bool {
        matches!(self, ElliottPhase::Wave5 | ElliottPhase::CorrectiveC)
    }
}

/// Structural hypothesis a swing sequence is scored against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScenarioType {
    Impulse,
    CorrectiveZigzag,
    CorrectiveFlat,
    CorrectiveTriangle,
    CorrectiveComplex,
    #[default]
    Unknown,
}

impl ScenarioType {
    #[inline]
    pub fn is_impulse(self) -> bool {
        matches!(self, ScenarioType::Impulse)
    }

    #[inline]
    pub fn is_corrective(self) -> bool {
        matches!(
            self,
            ScenarioType::CorrectiveZigzag
                | ScenarioType::CorrectiveFlat
                | ScenarioType::CorrectiveTriangle
                | ScenarioType::CorrectiveComplex
        )
    }
}

// ============================================================
// CHANNEL
// ============================================================

/// Price channel projected from recent swing extremes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElliottChannel {
    pub upper: f64,
    pub lower: f64,
    pub median: f64,
}

impl Default for ElliottChannel {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ElliottChannel {
    pub fn new(upper: f64, lower: f64) -> Self {
        Self {
            upper,
            lower,
            median: (upper + lower) / 2.0,
        }
    }

    pub fn invalid() -> Self {
        Self {
            upper: f64::NAN,
            lower: f64::NAN,
            median: f64::NAN,
        }
    }

    pub fn is_valid(&self) -> bool {
        num::is_valid(self.upper)
            && num::is_valid(self.lower)
            && num::is_valid(self.median)
            && self.upper >= self.lower
    }

    /// Whether `price` lies within the channel widened by `tolerance` on both
    /// sides. Always false for an invalid channel or price.
    pub fn contains(&self, price: f64, tolerance: f64) -> bool {
        if !self.is_valid() || !num::is_valid(price) {
            return false;
        }
        let tolerance = if num::is_valid(tolerance) { tolerance.max(0.0) } else { 0.0 };
        price >= self.lower - tolerance && price <= self.upper + tolerance
    }

    /// Projects the line through the last two rising swing tops and the line
    /// through the last two falling swing bottoms to `index`.
    ///
    /// Needs at least four swings with two of each direction; returns
    /// [`ElliottChannel::invalid`] otherwise.
    pub fn project(swings: &[ElliottSwing], index: usize) -> Self {
        if swings.len() < 4 {
            return Self::invalid();
        }

        let mut rising = swings.iter().rev().filter(|s| s.is_rising());
        let mut falling = swings.iter().rev().filter(|s| s.is_falling());

        let (Some(top_new), Some(top_old), Some(bottom_new), Some(bottom_old)) =
            (rising.next(), rising.next(), falling.next(), falling.next())
        else {
            return Self::invalid();
        };

        let upper = project_line(top_old, top_new, index);
        let lower = project_line(bottom_old, bottom_new, index);
        let channel = Self::new(upper, lower);
        if channel.is_valid() {
            channel
        } else {
            Self::invalid()
        }
    }
}

fn project_line(older: &ElliottSwing, newer: &ElliottSwing, index: usize) -> f64 {
    let span = newer.to_index as f64 - older.to_index as f64;
    if span == 0.0 || !num::is_valid(older.to_price) || !num::is_valid(newer.to_price) {
        return f64::NAN;
    }
    let slope = (newer.to_price - older.to_price) / span;
    newer.to_price + slope * (index as f64 - newer.to_index as f64)
}

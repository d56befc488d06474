//! ZigZag reversal state machine and the ZigZag swing detector
//!
//! The machine tracks the running extreme of the current leg and confirms a
//! pivot once price retreats from that extreme by at least the reversal
//! threshold. Each state depends only on the previous state and the current
//! `(price, threshold)` input, so the full history is a single left fold.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::helpers::{atr, clamp_index, price_series};
use crate::{
    num, ElliottDegree, PriceSource, Result, SwingDetector, SwingDetectorResult, SwingError,
    SwingPivot, OHLCV,
};

// ============================================================
// STATE MACHINE
// ============================================================

/// Direction of the leg currently being tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZigZagTrend {
    Up,
    Down,
    #[default]
    Undefined,
}

/// ZigZag state after processing one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZigZagState {
    pub last_high: Option<SwingPivot>,
    pub last_low: Option<SwingPivot>,
    pub trend: ZigZagTrend,
    pub extreme_index: usize,
    pub extreme_price: f64,
}

impl ZigZagState {
    /// State at the first bar: no pivots, undefined trend, extreme seeded here
    pub fn initial(index: usize, price: f64) -> Self {
        Self {
            last_high: None,
            last_low: None,
            trend: ZigZagTrend::Undefined,
            extreme_index: index,
            extreme_price: price,
        }
    }

    /// Transition on bar `index`.
    ///
    /// An invalid price leaves the state unchanged. An invalid or negative
    /// threshold never confirms a pivot, although legs keep extending.
    pub fn next(&self, index: usize, price: f64, threshold: f64) -> Self {
        let mut next = *self;
        if !num::is_valid(price) {
            return next;
        }
        if !num::is_valid(next.extreme_price) {
            next.extreme_index = index;
            next.extreme_price = price;
            return next;
        }

        let usable = num::is_valid(threshold) && threshold >= 0.0;
        let reaches = |movement: f64| usable && movement >= threshold;

        match self.trend {
            ZigZagTrend::Undefined => {
                if price > self.extreme_price {
                    next.trend = ZigZagTrend::Up;
                    next.seed(index, price);
                } else if price < self.extreme_price {
                    next.trend = ZigZagTrend::Down;
                    next.seed(index, price);
                }
            }
            ZigZagTrend::Up => {
                if price > self.extreme_price {
                    next.seed(index, price);
                } else if reaches(self.extreme_price - price) {
                    next.last_high = Some(SwingPivot::high(self.extreme_index, self.extreme_price));
                    next.trend = ZigZagTrend::Down;
                    next.seed(index, price);
                }
            }
            ZigZagTrend::Down => {
                if price < self.extreme_price {
                    next.seed(index, price);
                } else if reaches(price - self.extreme_price) {
                    next.last_low = Some(SwingPivot::low(self.extreme_index, self.extreme_price));
                    next.trend = ZigZagTrend::Up;
                    next.seed(index, price);
                }
            }
        }
        next
    }

    /// Pivot confirmed by the transition `prev -> self`, if any
    pub fn confirmed_since(&self, prev: &ZigZagState) -> Option<SwingPivot> {
        let index_of = |p: Option<SwingPivot>| p.map(|p| p.index);
        if index_of(self.last_high) != index_of(prev.last_high) {
            return self.last_high;
        }
        if index_of(self.last_low) != index_of(prev.last_low) {
            return self.last_low;
        }
        None
    }

    #[inline]
    fn seed(&mut self, index: usize, price: f64) {
        self.extreme_index = index;
        self.extreme_price = price;
    }
}

/// Iterator folding `(price, threshold)` inputs into per-bar states.
///
/// The threshold of the first input is ignored.
#[derive(Debug, Clone)]
pub struct ZigZagStates<I> {
    inputs: I,
    index: usize,
    state: Option<ZigZagState>,
}

impl<I> ZigZagStates<I>
where
    I: Iterator<Item = (f64, f64)>,
{
    pub fn new(inputs: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inputs: inputs.into_iter(),
            index: 0,
            state: None,
        }
    }
}

impl<I> Iterator for ZigZagStates<I>
where
    I: Iterator<Item = (f64, f64)>,
{
    type Item = ZigZagState;

    fn next(&mut self) -> Option<ZigZagState> {
        let (price, threshold) = self.inputs.next()?;
        let state = match &self.state {
            None => ZigZagState::initial(self.index, price),
            Some(prev) => prev.next(self.index, price, threshold),
        };
        self.state = Some(state);
        self.index += 1;
        Some(state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inputs.size_hint()
    }
}

/// Every pivot confirmed while folding `prices` with per-bar `thresholds`,
/// in confirmation order. Missing thresholds count as invalid.
pub fn replay_pivots(prices: &[f64], thresholds: &[f64]) -> Vec<SwingPivot> {
    let inputs = prices
        .iter()
        .enumerate()
        .map(|(i, &p)| (p, thresholds.get(i).copied().unwrap_or(f64::NAN)));

    let mut states = ZigZagStates::new(inputs);
    let mut pivots = Vec::new();
    let Some(mut prev) = states.next() else {
        return pivots;
    };
    for state in states {
        if let Some(pivot) = state.confirmed_since(&prev) {
            pivots.push(pivot);
        }
        prev = state;
    }
    pivots
}

// ============================================================
// REVERSAL AMOUNT
// ============================================================

/// How far price must retreat from an extreme to confirm it
#[derive(Debug, Clone, PartialEq)]
pub enum ReversalAmount {
    /// Constant absolute amount
    Fixed(f64),
    /// `ATR(period) * multiplier`
    Atr { period: usize, multiplier: f64 },
    /// Caller-supplied per-bar thresholds; bars past the end never confirm
    Series(Arc<[f64]>),
}

impl ReversalAmount {
    /// Per-bar thresholds for bars `0..=end`
    pub fn thresholds<T: OHLCV>(&self, bars: &[T], end: usize) -> Vec<f64> {
        match self {
            ReversalAmount::Fixed(amount) => vec![*amount; end + 1],
            ReversalAmount::Atr { period, multiplier } => {
                atr(bars, *period, end).into_iter().map(|v| v * multiplier).collect()
            }
            ReversalAmount::Series(values) => (0..=end)
                .map(|i| values.get(i).copied().unwrap_or(f64::NAN))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ReversalAmount::Fixed(amount) => {
                if !num::is_valid(*amount) {
                    return Err(SwingError::InvalidValue("reversal amount must be finite"));
                }
                if *amount < 0.0 {
                    return Err(SwingError::OutOfRange {
                        field: "reversal_amount",
                        value: *amount,
                        min: 0.0,
                        max: f64::MAX,
                    });
                }
            }
            ReversalAmount::Atr { period, multiplier } => {
                if *period == 0 {
                    return Err(SwingError::InvalidValue("ATR period must be > 0"));
                }
                if !num::is_valid(*multiplier) || *multiplier <= 0.0 {
                    return Err(SwingError::InvalidConfig(format!(
                        "ATR multiplier must be positive, got {multiplier}"
                    )));
                }
            }
            ReversalAmount::Series(_) => {}
        }
        Ok(())
    }
}

// ============================================================
// DETECTOR
// ============================================================

/// ZigZag swing detector with a fixed, ATR-scaled or external threshold
#[derive(Debug, Clone)]
pub struct ZigZagSwingDetector {
    price_source: PriceSource,
    reversal: ReversalAmount,
}

impl ZigZagSwingDetector {
    pub fn new(price_source: PriceSource, reversal: ReversalAmount) -> Result<Self> {
        reversal.validate()?;
        Ok(Self {
            price_source,
            reversal,
        })
    }

    /// Closing prices, constant threshold
    pub fn fixed(amount: f64) -> Result<Self> {
        Self::new(PriceSource::Close, ReversalAmount::Fixed(amount))
    }

    /// Closing prices, `ATR(period) * multiplier` threshold
    pub fn atr(period: usize, multiplier: f64) -> Result<Self> {
        Self::new(PriceSource::Close, ReversalAmount::Atr { period, multiplier })
    }

    pub fn price_source(&self) -> PriceSource {
        self.price_source
    }

    pub fn reversal(&self) -> &ReversalAmount {
        &self.reversal
    }

    /// State after every bar up to `index`
    pub fn states<T: OHLCV>(&self, bars: &[T], index: usize) -> Vec<ZigZagState> {
        let Some(end) = clamp_index(bars.len(), index) else {
            return Vec::new();
        };
        let prices = price_series(bars, self.price_source, end);
        let thresholds = self.reversal.thresholds(bars, end);
        ZigZagStates::new(prices.into_iter().zip(thresholds)).collect()
    }
}

impl SwingDetector for ZigZagSwingDetector {
    fn name(&self) -> &'static str {
        "zigzag"
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        degree: ElliottDegree,
    ) -> SwingDetectorResult {
        let Some(end) = clamp_index(bars.len(), index) else {
            return SwingDetectorResult::empty();
        };
        let prices = price_series(bars, self.price_source, end);
        let thresholds = self.reversal.thresholds(bars, end);
        SwingDetectorResult::from_pivots(replay_pivots(&prices, &thresholds), degree)
    }

    fn validate_config(&self) -> Result<()> {
        self.reversal.validate()
    }
}

//! Fixed-window fractal swing detector
//!
//! A bar is a swing high when its high strictly exceeds `lookback` bars before
//! and `lookforward` bars after it. Flat tops and bottoms are tolerated by
//! letting up to `allowed_equal_bars` neighbours on each side share the
//! candidate's value. Confirmation lags by `lookforward` bars.

use super::helpers::{clamp_index, price_series};
use crate::{
    num, ElliottDegree, PivotType, PriceSource, Result, SwingDetector, SwingDetectorResult,
    SwingError, SwingPivot, OHLCV,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractalSwingDetector {
    lookback: usize,
    lookforward: usize,
    allowed_equal_bars: usize,
    high_source: PriceSource,
    low_source: PriceSource,
}

impl FractalSwingDetector {
    /// Symmetric window, strict extremes (no equal neighbours)
    pub fn new(window: usize) -> Result<Self> {
        Self::with_windows(window, window, 0)
    }

    pub fn with_windows(
        lookback: usize,
        lookforward: usize,
        allowed_equal_bars: usize,
    ) -> Result<Self> {
        let detector = Self {
            lookback,
            lookforward,
            allowed_equal_bars,
            high_source: PriceSource::High,
            low_source: PriceSource::Low,
        };
        detector.check()?;
        Ok(detector)
    }

    /// Read highs and lows from other price fields (e.g. closes on both sides)
    pub fn with_sources(mut self, high_source: PriceSource, low_source: PriceSource) -> Self {
        self.high_source = high_source;
        self.low_source = low_source;
        self
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn lookforward(&self) -> usize {
        self.lookforward
    }

    pub fn allowed_equal_bars(&self) -> usize {
        self.allowed_equal_bars
    }

    fn check(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(SwingError::InvalidValue("lookback must be > 0"));
        }
        if self.lookforward == 0 {
            return Err(SwingError::InvalidValue("lookforward must be > 0"));
        }
        Ok(())
    }

    /// Indexes of confirmed fractals in `values[..=last]`
    fn confirmed(&self, values: &[f64], last: usize, kind: PivotType) -> Vec<usize> {
        let Some(latest) = last.checked_sub(self.lookforward) else {
            return Vec::new();
        };
        (self.lookback..=latest)
            .filter(|&i| self.is_confirmed(values, i, last, kind))
            .collect()
    }

    fn is_confirmed(&self, values: &[f64], candidate: usize, last: usize, kind: PivotType) -> bool {
        let value = values[candidate];
        if !num::is_valid(value) {
            return false;
        }
        let Some(start) = plateau_start(values, candidate, value, self.allowed_equal_bars) else {
            return false;
        };
        let Some(end) = plateau_end(values, candidate, last, value, self.allowed_equal_bars) else {
            return false;
        };

        let dominates = |other: f64| {
            num::is_valid(other)
                && match kind {
                    PivotType::High => value > other,
                    PivotType::Low => value < other,
                }
        };

        let Some(first_before) = start.checked_sub(self.lookback) else {
            return false;
        };
        if end + self.lookforward > last {
            return false;
        }
        values[first_before..start].iter().all(|&v| dominates(v))
            && values[end + 1..=end + self.lookforward].iter().all(|&v| dominates(v))
    }
}

/// First bar of the plateau ending at `candidate`, or `None` when the plateau
/// is longer than allowed or touches an invalid value
fn plateau_start(values: &[f64], candidate: usize, value: f64, allowed: usize) -> Option<usize> {
    let mut index = candidate;
    let mut used = 0;
    while index > 0 && used < allowed {
        let prev = values[index - 1];
        if !num::is_valid(prev) {
            return None;
        }
        if prev != value {
            break;
        }
        used += 1;
        index -= 1;
    }
    if index > 0 && values[index - 1] == value {
        return None;
    }
    Some(index)
}

fn plateau_end(
    values: &[f64],
    candidate: usize,
    last: usize,
    value: f64,
    allowed: usize,
) -> Option<usize> {
    let mut index = candidate;
    let mut used = 0;
    while index < last && used < allowed {
        let next = values[index + 1];
        if !num::is_valid(next) {
            return None;
        }
        if next != value {
            break;
        }
        used += 1;
        index += 1;
    }
    if index < last && values[index + 1] == value {
        return None;
    }
    Some(index)
}

/// Merge confirmed highs and lows in index order.
///
/// A bar that is both a high and a low takes the type opposite to the
/// previous pivot; as the first pivot it becomes whichever side has the
/// larger price. Same-type runs keep the more extreme pivot.
fn merge_fractals(
    highs: &[usize],
    lows: &[usize],
    high_values: &[f64],
    low_values: &[f64],
) -> Vec<SwingPivot> {
    let mut pivots: Vec<SwingPivot> = Vec::with_capacity(highs.len() + lows.len());
    let (mut h, mut l) = (0, 0);

    while h < highs.len() || l < lows.len() {
        let next_high = highs.get(h).copied();
        let next_low = lows.get(l).copied();

        let pivot = match (next_high, next_low) {
            (Some(hi), Some(lo)) if hi == lo => {
                h += 1;
                l += 1;
                let high = SwingPivot::high(hi, high_values[hi]);
                let low = SwingPivot::low(lo, low_values[lo]);
                match pivots.last() {
                    Some(last) if last.pivot_type == PivotType::High => low,
                    Some(_) => high,
                    None if high.price >= low.price || !num::is_valid(low.price) => high,
                    None => low,
                }
            }
            (Some(hi), Some(lo)) if hi < lo => {
                h += 1;
                SwingPivot::high(hi, high_values[hi])
            }
            (Some(hi), None) => {
                h += 1;
                SwingPivot::high(hi, high_values[hi])
            }
            (_, Some(lo)) => {
                l += 1;
                SwingPivot::low(lo, low_values[lo])
            }
            (None, None) => break,
        };

        absorb(&mut pivots, pivot);
    }
    pivots
}

fn absorb(pivots: &mut Vec<SwingPivot>, pivot: SwingPivot) {
    if !num::is_valid(pivot.price) {
        return;
    }
    match pivots.last_mut() {
        Some(last) if last.pivot_type == pivot.pivot_type => {
            if pivot.is_at_least_as_extreme_as(last) {
                *last = pivot;
            }
        }
        _ => pivots.push(pivot),
    }
}

impl SwingDetector for FractalSwingDetector {
    fn name(&self) -> &'static str {
        "fractal"
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
        let high_values = price_series(bars, self.high_source, end);
        let low_values = price_series(bars, self.low_source, end);

        let highs = self.confirmed(&high_values, end, PivotType::High);
        let lows = self.confirmed(&low_values, end, PivotType::Low);

        let pivots = merge_fractals(&highs, &lows, &high_values, &low_values);
        SwingDetectorResult::from_pivots(pivots, degree)
    }

    fn validate_config(&self) -> Result<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct Bar {
        h: f64,
        l: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            (self.h + self.l) / 2.0
        }
        fn high(&self) -> f64 {
            self.h
        }
        fn low(&self) -> f64 {
            self.l
        }
        fn close(&self) -> f64 {
            (self.h + self.l) / 2.0
        }
        fn volume(&self) -> f64 {
            0.0
        }
    }

    /// Bars with a one point range around each midpoint
    fn bars(mids: &[f64]) -> Vec<Bar> {
        mids.iter().map(|&m| Bar { h: m + 0.5, l: m - 0.5 }).collect()
    }

    #[test]
    fn test_basic_fractals() {
        let detector = FractalSwingDetector::new(2).unwrap();
        let series = bars(&[10.0, 11.0, 14.0, 12.0, 11.0, 8.0, 9.0, 10.0, 12.0]);
        let result = detector.detect(&series, 8, ElliottDegree::Minor);
        assert_eq!(result.pivots, vec![SwingPivot::high(2, 14.5), SwingPivot::low(5, 7.5)]);
        assert_eq!(result.swings.len(), 1);
    }

    #[test]
    fn test_lookforward_delays_confirmation() {
        let detector = FractalSwingDetector::new(2).unwrap();
        let series = bars(&[10.0, 11.0, 14.0, 12.0, 11.0]);
        assert_eq!(detector.detect(&series, 3, ElliottDegree::Minor).pivots.len(), 0);
        assert_eq!(detector.detect(&series, 4, ElliottDegree::Minor).pivots.len(), 1);
    }

    #[test]
    fn test_plateau_needs_allowance() {
        let mids = [10.0, 11.0, 14.0, 14.0, 12.0, 11.0];
        let series = bars(&mids);

        let strict = FractalSwingDetector::new(2).unwrap();
        assert!(strict.detect(&series, 5, ElliottDegree::Minor).is_empty());

        let tolerant = FractalSwingDetector::with_windows(2, 2, 1).unwrap();
        let result = tolerant.detect(&series, 5, ElliottDegree::Minor);
        // both plateau bars qualify; the later one wins the tie
        assert_eq!(result.pivots, vec![SwingPivot::high(3, 14.5)]);
    }

    #[test]
    fn test_invalid_neighbour_blocks_confirmation() {
        let mut series = bars(&[10.0, 11.0, 14.0, 12.0, 11.0]);
        series[3].h = f64::NAN;
        let detector = FractalSwingDetector::new(2).unwrap();
        assert!(detector.detect(&series, 4, ElliottDegree::Minor).is_empty());
    }

    #[test]
    fn test_bar_that_is_both_high_and_low() {
        // outside bar at 2 exceeds neighbours on both sides
        let series = vec![
            Bar { h: 10.0, l: 9.0 },
            Bar { h: 15.0, l: 5.0 },
            Bar { h: 10.0, l: 9.0 },
        ];
        let detector = FractalSwingDetector::new(1).unwrap();
        let result = detector.detect(&series, 2, ElliottDegree::Minor);
        assert_eq!(result.pivots, vec![SwingPivot::high(1, 15.0)]);

        let pivots = merge_fractals(&[3], &[1, 3], &[0.0, 0.0, 0.0, 15.0], &[0.0, 4.0, 0.0, 5.0]);
        assert_eq!(pivots, vec![SwingPivot::low(1, 4.0), SwingPivot::high(3, 15.0)]);
    }

    #[test]
    fn test_config_errors() {
        assert!(FractalSwingDetector::new(0).is_err());
        assert!(FractalSwingDetector::with_windows(2, 0, 0).is_err());
        assert_eq!(FractalSwingDetector::new(3).unwrap().allowed_equal_bars(), 0);
    }
}

//! Common helper functions for swing detection
//!
//! Volatility series (true range, Wilder ATR, SMA) and pivot normalization
//! shared across all detector modules.

use crate::{num, ElliottDegree, ElliottSwing, PriceSource, SwingPivot, OHLCV};

// ============================================================
// SERIES HELPERS
// ============================================================

/// Clamp `index` to the last bar; `None` for an empty series.
#[inline]
pub fn clamp_index(len: usize, index: usize) -> Option<usize> {
    len.checked_sub(1).map(|last| index.min(last))
}

/// Selected price for bars `0..=end`
pub fn price_series<T: OHLCV>(bars: &[T], source: PriceSource, end: usize) -> Vec<f64> {
    bars[..=end].iter().map(|b| source.price(b)).collect()
}

/// True range for bars `0..=end`. The first bar uses `high - low`.
pub fn true_range<T: OHLCV>(bars: &[T], end: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(end + 1);
    for i in 0..=end {
        let bar = &bars[i];
        let hl = bar.high() - bar.low();
        let tr = if i == 0 {
            hl
        } else {
            let prev_close = bars[i - 1].close();
            let hc = (bar.high() - prev_close).abs();
            let lc = (bar.low() - prev_close).abs();
            hl.max(hc).max(lc)
        };
        out.push(if num::is_valid(hl) { tr } else { f64::NAN });
    }
    out
}

/// Wilder's moving average (alpha = 1/period), seeded with the first valid
/// input. Invalid inputs produce `NaN` at their position and leave the
/// running average untouched.
pub fn wilder_average(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1) as f64;
    let mut out = Vec::with_capacity(values.len());
    let mut state: Option<f64> = None;
    for &value in values {
        if !num::is_valid(value) {
            out.push(f64::NAN);
            continue;
        }
        let next = match state {
            None => value,
            Some(prev) => prev + (value - prev) / period,
        };
        state = Some(next);
        out.push(next);
    }
    out
}

/// Average true range (Wilder) for bars `0..=end`
pub fn atr<T: OHLCV>(bars: &[T], period: usize, end: usize) -> Vec<f64> {
    wilder_average(&true_range(bars, end), period)
}

/// Simple moving average over the trailing `period` values. The first
/// `period - 1` outputs average what is available. Any invalid value in the
/// window makes the output `NaN`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    (0..values.len())
        .map(|i| {
            let window = &values[(i + 1).saturating_sub(period)..=i];
            if window.iter().any(|v| !num::is_valid(*v)) {
                return f64::NAN;
            }
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

// ============================================================
// PIVOT NORMALIZATION
// ============================================================

/// Canonical pivot sequence.
///
/// Drops invalid prices, stable-sorts by index and collapses adjacent pivots
/// of the same type to the more extreme one (ties go to the later pivot). A
/// pivot of the other type sitting on the same bar as the last kept pivot is
/// dropped, so every leg spans at least one bar.
pub fn normalize_pivots(mut pivots: Vec<SwingPivot>) -> Vec<SwingPivot> {
    pivots.retain(|p| num::is_valid(p.price));
    pivots.sort_by_key(|p| p.index);

    let mut out: Vec<SwingPivot> = Vec::with_capacity(pivots.len());
    for pivot in pivots {
        match out.last_mut() {
            Some(last) if last.pivot_type == pivot.pivot_type => {
                if pivot.is_at_least_as_extreme_as(last) {
                    *last = pivot;
                }
            }
            Some(last) if last.index == pivot.index => {}
            _ => out.push(pivot),
        }
    }
    out
}

/// Legs between consecutive pivots
pub fn swings_from_pivots(pivots: &[SwingPivot], degree: ElliottDegree) -> Vec<ElliottSwing> {
    pivots
        .windows(2)
        .filter_map(|pair| ElliottSwing::from_pivots(&pair[0], &pair[1], degree))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PivotType;

    struct Bar {
        h: f64,
        l: f64,
        c: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.c
        }
        fn high(&self) -> f64 {
            self.h
        }
        fn low(&self) -> f64 {
            self.l
        }
        fn close(&self) -> f64 {
            self.c
        }
        fn volume(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(0, 3), None);
        assert_eq!(clamp_index(5, 10), Some(4));
        assert_eq!(clamp_index(5, 2), Some(2));
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let bars = vec![
            Bar { h: 11.0, l: 9.0, c: 10.0 },
            Bar { h: 14.0, l: 12.0, c: 13.0 },
        ];
        let tr = true_range(&bars, 1);
        assert_eq!(tr, vec![2.0, 4.0]);
    }

    #[test]
    fn test_wilder_average() {
        let avg = wilder_average(&[2.0, 4.0, f64::NAN, 4.0], 2);
        assert_eq!(avg[0], 2.0);
        assert_eq!(avg[1], 3.0);
        assert!(avg[2].is_nan());
        assert_eq!(avg[3], 3.5);
    }

    #[test]
    fn test_sma_partial_window() {
        let out = sma(&[1.0, 3.0, 5.0, 7.0], 3);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 5.0]);
        assert_eq!(sma(&[1.0, 3.0], 1), vec![1.0, 3.0]);
    }

    #[test]
    fn test_normalize_collapses_same_type() {
        let pivots = vec![
            SwingPivot::high(5, 12.0),
            SwingPivot::low(1, 8.0),
            SwingPivot::high(3, 14.0),
            SwingPivot::low(7, 9.0),
        ];
        let out = normalize_pivots(pivots);
        let expected =
            vec![SwingPivot::low(1, 8.0), SwingPivot::high(3, 14.0), SwingPivot::low(7, 9.0)];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_normalize_tie_keeps_later() {
        let out = normalize_pivots(vec![SwingPivot::low(2, 5.0), SwingPivot::low(4, 5.0)]);
        assert_eq!(out, vec![SwingPivot::low(4, 5.0)]);
    }

    #[test]
    fn test_normalize_drops_invalid_and_same_bar_conflicts() {
        let out = normalize_pivots(vec![
            SwingPivot::high(1, f64::NAN),
            SwingPivot::low(2, 5.0),
            SwingPivot::high(2, 9.0),
            SwingPivot::high(4, 9.0),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].pivot_type, PivotType::Low);
        assert_eq!(out[1].index, 4);
    }

    #[test]
    fn test_swings_from_pivots() {
        let pivots =
            vec![SwingPivot::low(1, 8.0), SwingPivot::high(3, 14.0), SwingPivot::low(7, 9.0)];
        let swings = swings_from_pivots(&pivots, ElliottDegree::Minute);
        assert_eq!(swings.len(), 2);
        assert!(swings[0].is_rising());
        assert_eq!(swings[1].from_index, 3);
        assert_eq!(swings[1].degree, ElliottDegree::Minute);
    }
}

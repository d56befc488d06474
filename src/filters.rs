//! Swing post-processing filters

use crate::{num, ElliottSwing, Ratio, Result, SwingError, OHLCV};

/// Pure transformation over a swing sequence
pub trait SwingFilter: Send + Sync {
    fn filter(&self, swings: &[ElliottSwing]) -> Vec<ElliottSwing>;
}

/// Any thread-safe closure over swings is a filter
impl<F> SwingFilter for F
where
    F: Fn(&[ElliottSwing]) -> Vec<ElliottSwing> + Send + Sync,
{
    fn filter(&self, swings: &[ElliottSwing]) -> Vec<ElliottSwing> {
        self(swings)
    }
}

/// Drops swings smaller than a fraction of the largest swing amplitude.
/// Swings with an invalid amplitude are always dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMagnitudeSwingFilter {
    relative_threshold: f64,
}

impl MinMagnitudeSwingFilter {
    /// `relative_threshold` must lie in (0, 1]
    pub fn new(relative_threshold: f64) -> Result<Self> {
        Self::with_ratio(Ratio::new(relative_threshold)?)
    }

    /// Zero is rejected: it would keep every swing
    pub fn with_ratio(relative_threshold: Ratio) -> Result<Self> {
        if relative_threshold.get() == 0.0 {
            return Err(SwingError::OutOfRange {
                field: "relative_threshold",
                value: 0.0,
                min: f64::MIN_POSITIVE,
                max: 1.0,
            });
        }
        Ok(Self {
            relative_threshold: relative_threshold.get(),
        })
    }

    pub fn relative_threshold(&self) -> f64 {
        self.relative_threshold
    }
}

impl SwingFilter for MinMagnitudeSwingFilter {
    fn filter(&self, swings: &[ElliottSwing]) -> Vec<ElliottSwing> {
        let max_amplitude = swings
            .iter()
            .map(ElliottSwing::amplitude)
            .filter(|a| num::is_valid(*a))
            .fold(f64::NAN, f64::max);
        if !num::is_valid(max_amplitude) {
            return Vec::new();
        }

        let cutoff = max_amplitude * self.relative_threshold;
        let kept: Vec<ElliottSwing> = swings
            .iter()
            .filter(|s| {
                let amplitude = s.amplitude();
                num::is_valid(amplitude) && amplitude >= cutoff
            })
            .copied()
            .collect();

        if kept.len() < swings.len() {
            tracing::debug!(
                dropped = swings.len() - kept.len(),
                kept = kept.len(),
                cutoff,
                "magnitude filter dropped swings"
            );
        }
        kept
    }
}

// ============================================================
// COMPRESSOR
// ============================================================

/// Minimum length applied by [`SwingCompressor::relative_to_close`]
pub const DEFAULT_MIN_SWING_BARS: usize = 2;

/// Drops swings below an absolute amplitude or shorter than a bar count.
///
/// A zero bound disables that check, so [`SwingCompressor::default`] keeps
/// every swing. With an amplitude bound, invalid amplitudes are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwingCompressor {
    min_amplitude: f64,
    min_length: usize,
}

impl SwingCompressor {
    pub fn new(min_amplitude: f64, min_length: usize) -> Result<Self> {
        if !num::is_valid(min_amplitude) {
            return Err(SwingError::InvalidValue("minimum amplitude must be finite"));
        }
        if min_amplitude < 0.0 {
            return Err(SwingError::OutOfRange {
                field: "min_amplitude",
                value: min_amplitude,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self {
            min_amplitude,
            min_length,
        })
    }

    /// Amplitude bound = `percentage` of the last close, e.g. 1% and 2 bars
    pub fn relative_to_close<T: OHLCV>(
        bars: &[T],
        percentage: Ratio,
        min_length: usize,
    ) -> Result<Self> {
        let Some(last) = bars.last() else {
            return Err(SwingError::InsufficientData { need: 1, got: 0 });
        };
        if percentage.get() == 0.0 {
            return Err(SwingError::InvalidConfig(
                "compressor percentage must be in (0, 1]".to_string(),
            ));
        }
        let close = last.close();
        if !num::is_valid(close) {
            return Err(SwingError::InvalidOHLCV {
                index: bars.len() - 1,
                reason: "close must be finite",
            });
        }
        Self::new(close.abs() * percentage.get(), min_length)
    }

    /// One percent of the last close, [`DEFAULT_MIN_SWING_BARS`] bars
    pub fn for_series<T: OHLCV>(bars: &[T]) -> Result<Self> {
        Self::relative_to_close(bars, Ratio::new_const(0.01), DEFAULT_MIN_SWING_BARS)
    }

    pub fn min_amplitude(&self) -> f64 {
        self.min_amplitude
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    fn keeps(&self, swing: &ElliottSwing) -> bool {
        if swing.length() < self.min_length {
            return false;
        }
        if self.min_amplitude > 0.0 {
            let amplitude = swing.amplitude();
            return num::is_valid(amplitude) && amplitude >= self.min_amplitude;
        }
        true
    }
}

impl SwingFilter for SwingCompressor {
    fn filter(&self, swings: &[ElliottSwing]) -> Vec<ElliottSwing> {
        let kept: Vec<ElliottSwing> = swings.iter().filter(|s| self.keeps(s)).copied().collect();
        if kept.len() < swings.len() {
            tracing::debug!(
                dropped = swings.len() - kept.len(),
                min_amplitude = self.min_amplitude,
                min_length = self.min_length,
                "compressor dropped swings"
            );
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElliottDegree;

    fn swing(from: usize, from_price: f64, to_price: f64) -> ElliottSwing {
        ElliottSwing::new(from, from + 1, from_price, to_price, ElliottDegree::Minor)
    }

    #[test]
    fn test_keeps_large_swings() {
        let filter = MinMagnitudeSwingFilter::new(0.5).unwrap();
        let swings = vec![swing(0, 100.0, 110.0), swing(1, 110.0, 107.0), swing(2, 107.0, 113.0)];
        let kept = filter.filter(&swings);
        assert_eq!(kept, vec![swings[0], swings[2]]);
    }

    #[test]
    fn test_invalid_amplitude_dropped() {
        let filter = MinMagnitudeSwingFilter::new(0.1).unwrap();
        let swings = vec![swing(0, 100.0, 110.0), swing(1, f64::NAN, 104.0)];
        assert_eq!(filter.filter(&swings), vec![swings[0]]);
        assert!(filter.filter(&[swing(0, f64::NAN, 1.0)]).is_empty());
        assert!(filter.filter(&[]).is_empty());
    }

    #[test]
    fn test_threshold_range() {
        assert!(MinMagnitudeSwingFilter::new(0.0).is_err());
        assert!(MinMagnitudeSwingFilter::new(1.01).is_err());
        assert!(MinMagnitudeSwingFilter::new(f64::NAN).is_err());
        assert!(MinMagnitudeSwingFilter::new(1.0).is_ok());
    }

    #[test]
    fn test_with_ratio() {
        let filter = MinMagnitudeSwingFilter::with_ratio(Ratio::new(0.25).unwrap()).unwrap();
        assert_eq!(filter.relative_threshold(), 0.25);
        assert!(MinMagnitudeSwingFilter::with_ratio(Ratio::new(0.0).unwrap()).is_err());
    }

    struct Bar(f64);

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.0
        }
        fn high(&self) -> f64 {
            self.0
        }
        fn low(&self) -> f64 {
            self.0
        }
        fn close(&self) -> f64 {
            self.0
        }
        fn volume(&self) -> f64 {
            0.0
        }
    }

    fn leg(from: usize, to: usize, from_price: f64, to_price: f64) -> ElliottSwing {
        ElliottSwing::new(from, to, from_price, to_price, ElliottDegree::Minor)
    }

    #[test]
    fn test_compressor_amplitude_cutoff() {
        // legs of 3, 4, 5, 6, 7 and 8 points, one bar each
        let swings = vec![
            leg(1, 2, 12.0, 9.0),
            leg(2, 3, 9.0, 13.0),
            leg(3, 4, 13.0, 8.0),
            leg(4, 5, 8.0, 14.0),
            leg(5, 6, 14.0, 7.0),
            leg(6, 7, 7.0, 15.0),
        ];
        let compressed = SwingCompressor::new(5.0, 0).unwrap().filter(&swings);
        assert_eq!(compressed.len(), 4);
        assert!(compressed.iter().all(|s| s.amplitude() >= 5.0));
        assert_eq!(compressed[0].from_index, 3);
        assert_eq!(compressed[3].to_index, 7);
    }

    #[test]
    fn test_compressor_length_cutoff() {
        let swings = vec![leg(1, 2, 12.0, 9.0), leg(2, 3, 9.0, 13.0), leg(3, 6, 13.0, 8.0)];
        let compressed = SwingCompressor::new(0.0, 2).unwrap().filter(&swings);
        assert_eq!(compressed, vec![swings[2]]);
        assert!(SwingCompressor::new(0.0, 4).unwrap().filter(&swings).is_empty());
    }

    #[test]
    fn test_default_compressor_keeps_everything() {
        let swings = vec![leg(1, 2, 12.0, 9.0), leg(2, 2, 9.0, f64::NAN)];
        let kept = SwingCompressor::default().filter(&swings);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].to_index, 2);
    }

    #[test]
    fn test_compressor_relative_to_close() {
        let bars: Vec<Bar> = [100.0, 102.0, 98.0, 95.0].into_iter().map(Bar).collect();
        let compressor = SwingCompressor::for_series(&bars).unwrap();
        assert!((compressor.min_amplitude() - 0.95).abs() < 1e-12);
        assert_eq!(compressor.min_length(), DEFAULT_MIN_SWING_BARS);

        let two_percent = Ratio::new(0.02).unwrap();
        let custom = SwingCompressor::relative_to_close(&bars, two_percent, 3).unwrap();
        assert!((custom.min_amplitude() - 1.9).abs() < 1e-12);

        let empty: Vec<Bar> = Vec::new();
        assert!(SwingCompressor::for_series(&empty).is_err());
        assert!(SwingCompressor::relative_to_close(&bars, Ratio::new(0.0).unwrap(), 2).is_err());
        assert!(SwingCompressor::new(-1.0, 0).is_err());
    }

    #[test]
    fn test_closure_filter() {
        let rising_only = |swings: &[ElliottSwing]| -> Vec<ElliottSwing> {
            swings.iter().filter(|s| s.is_rising()).copied().collect()
        };
        let swings = vec![swing(0, 100.0, 110.0), swing(1, 110.0, 107.0)];
        assert_eq!(SwingFilter::filter(&rising_only, &swings).len(), 1);
    }
}

//! Volatility-adaptive ZigZag
//!
//! Reversal threshold at bar i is `ATR(period)[i] * multiplier`, optionally
//! smoothed with an SMA and clamped to `[min_threshold, max_threshold]`.

use serde::{Deserialize, Serialize};

use super::helpers::{atr, clamp_index, price_series, sma};
use super::zigzag::replay_pivots;
use crate::{
    num, ElliottDegree, PriceSource, Result, SwingDetector, SwingDetectorResult, SwingError, OHLCV,
};

/// Adaptive ZigZag configuration. A bound of 0 disables it; a smoothing
/// period of 1 disables smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdaptiveZigZagConfig {
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub smoothing_period: usize,
}

impl Default for AdaptiveZigZagConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_multiplier: 1.0,
            min_threshold: 0.0,
            max_threshold: 0.0,
            smoothing_period: 3,
        }
    }
}

impl AdaptiveZigZagConfig {
    pub fn new(
        atr_period: usize,
        atr_multiplier: f64,
        min_threshold: f64,
        max_threshold: f64,
        smoothing_period: usize,
    ) -> Result<Self> {
        let config = Self {
            atr_period,
            atr_multiplier,
            min_threshold,
            max_threshold,
            smoothing_period,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.atr_period == 0 {
            return Err(SwingError::InvalidValue("ATR period must be > 0"));
        }
        if !num::is_valid(self.atr_multiplier) || self.atr_multiplier <= 0.0 {
            return Err(SwingError::InvalidConfig(format!(
                "ATR multiplier must be positive, got {}",
                self.atr_multiplier
            )));
        }
        let bounds = [("min_threshold", self.min_threshold), ("max_threshold", self.max_threshold)];
        for (field, value) in bounds {
            if !num::is_valid(value) {
                return Err(SwingError::InvalidValue("threshold bounds must be finite"));
            }
            if value < 0.0 {
                return Err(SwingError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        let both_set = self.min_threshold > 0.0 && self.max_threshold > 0.0;
        if both_set && self.max_threshold < self.min_threshold {
            return Err(SwingError::InvalidConfig(format!(
                "max_threshold {} below min_threshold {}",
                self.max_threshold, self.min_threshold
            )));
        }
        if self.smoothing_period == 0 {
            return Err(SwingError::InvalidValue("smoothing period must be >= 1"));
        }
        Ok(())
    }

    fn clamp(&self, threshold: f64) -> f64 {
        if !num::is_valid(threshold) {
            return threshold;
        }
        let mut value = threshold;
        if self.min_threshold > 0.0 {
            value = value.max(self.min_threshold);
        }
        if self.max_threshold > 0.0 {
            value = value.min(self.max_threshold);
        }
        value
    }
}

#[derive(Deserialize)]
struct AdaptiveZigZagConfigRepr {
    #[serde(default = "default_atr_period")]
    atr_period: usize,
    #[serde(default = "default_atr_multiplier")]
    atr_multiplier: f64,
    #[serde(default)]
    min_threshold: f64,
    #[serde(default)]
    max_threshold: f64,
    #[serde(default = "default_smoothing_period")]
    smoothing_period: usize,
}

fn default_atr_period() -> usize {
    AdaptiveZigZagConfig::default().atr_period
}

fn default_atr_multiplier() -> f64 {
    AdaptiveZigZagConfig::default().atr_multiplier
}

fn default_smoothing_period() -> usize {
    AdaptiveZigZagConfig::default().smoothing_period
}

impl<'de> Deserialize<'de> for AdaptiveZigZagConfig {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = AdaptiveZigZagConfigRepr::deserialize(d)?;
        AdaptiveZigZagConfig::new(
            raw.atr_period,
            raw.atr_multiplier,
            raw.min_threshold,
            raw.max_threshold,
            raw.smoothing_period,
        )
        .map_err(serde::de::Error::custom)
    }
}

/// ZigZag whose reversal threshold follows volatility
#[derive(Debug, Clone, Default)]
pub struct AdaptiveZigZagSwingDetector {
    config: AdaptiveZigZagConfig,
    price_source: PriceSource,
}

impl AdaptiveZigZagSwingDetector {
    pub fn new(config: AdaptiveZigZagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            price_source: PriceSource::Close,
        })
    }

    pub fn with_price_source(mut self, price_source: PriceSource) -> Self {
        self.price_source = price_source;
        self
    }

    pub fn config(&self) -> &AdaptiveZigZagConfig {
        &self.config
    }

    /// Effective reversal threshold for bars `0..=index`
    pub fn thresholds<T: OHLCV>(&self, bars: &[T], index: usize) -> Vec<f64> {
        let Some(end) = clamp_index(bars.len(), index) else {
            return Vec::new();
        };
        let raw: Vec<f64> = atr(bars, self.config.atr_period, end)
            .into_iter()
            .map(|v| v * self.config.atr_multiplier)
            .collect();
        let smoothed = if self.config.smoothing_period > 1 {
            sma(&raw, self.config.smoothing_period)
        } else {
            raw
        };
        smoothed.into_iter().map(|t| self.config.clamp(t)).collect()
    }
}

impl SwingDetector for AdaptiveZigZagSwingDetector {
    fn name(&self) -> &'static str {
        "adaptive_zigzag"
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
        let thresholds = self.thresholds(bars, end);
        SwingDetectorResult::from_pivots(replay_pivots(&prices, &thresholds), degree)
    }

    fn validate_config(&self) -> Result<()> {
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn ranged(closes: &[f64], half_range: f64) -> Vec<Bar> {
        closes
            .iter()
            .map(|&c| Bar {
                h: c + half_range,
                l: c - half_range,
                c,
            })
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = AdaptiveZigZagConfig::default();
        assert_eq!(config.atr_period, 14);
        assert_eq!(config.atr_multiplier, 1.0);
        assert_eq!(config.smoothing_period, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_errors() {
        assert!(AdaptiveZigZagConfig::new(0, 1.0, 0.0, 0.0, 1).is_err());
        assert!(AdaptiveZigZagConfig::new(14, 0.0, 0.0, 0.0, 1).is_err());
        assert!(AdaptiveZigZagConfig::new(14, 1.0, -1.0, 0.0, 1).is_err());
        assert!(AdaptiveZigZagConfig::new(14, 1.0, 5.0, 2.0, 1).is_err());
        assert!(AdaptiveZigZagConfig::new(14, 1.0, 0.0, 0.0, 0).is_err());
        // one bound disabled: no ordering constraint
        assert!(AdaptiveZigZagConfig::new(14, 1.0, 5.0, 0.0, 1).is_ok());
    }

    #[test]
    fn test_constant_range_threshold() {
        let config = AdaptiveZigZagConfig::new(3, 2.0, 0.0, 0.0, 1).unwrap();
        let detector = AdaptiveZigZagSwingDetector::new(config).unwrap();
        let bars = ranged(&[10.0; 6], 0.5);
        let thresholds = detector.thresholds(&bars, 5);
        assert!(thresholds.iter().all(|t| (t - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_bounds_clamp_threshold() {
        let config = AdaptiveZigZagConfig::new(3, 1.0, 2.0, 0.0, 1).unwrap();
        let detector = AdaptiveZigZagSwingDetector::new(config).unwrap();
        let bars = ranged(&[10.0; 4], 0.25);
        assert!(detector.thresholds(&bars, 3).iter().all(|t| *t == 2.0));

        let config = AdaptiveZigZagConfig::new(3, 10.0, 0.0, 1.5, 1).unwrap();
        let detector = AdaptiveZigZagSwingDetector::new(config).unwrap();
        assert!(detector.thresholds(&bars, 3).iter().all(|t| *t == 1.5));
    }

    #[test]
    fn test_detects_large_reversals_only() {
        let config = AdaptiveZigZagConfig::new(2, 1.0, 0.0, 0.0, 1).unwrap();
        let detector = AdaptiveZigZagSwingDetector::new(config).unwrap();
        // true range tracks the gaps but stays under the 10 point moves
        let bars = ranged(&[10.0, 20.0, 10.0, 20.0, 10.0], 0.5);
        let result = detector.detect(&bars, 4, ElliottDegree::Minor);
        assert_eq!(result.pivot_indexes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: AdaptiveZigZagConfig = serde_json::from_str(r#"{"atr_period": 10}"#).unwrap();
        assert_eq!(ok.atr_period, 10);
        assert_eq!(ok.smoothing_period, 3);

        let bad = serde_json::from_str::<AdaptiveZigZagConfig>(r#"{"atr_multiplier": -1.0}"#);
        assert!(bad.is_err());
    }
}

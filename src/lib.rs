//! # swingwave - Swing detection and Elliott-wave confidence scoring
//!
//! Finds significant price reversals in a bar series and grades how well the
//! resulting swing sequence fits Elliott-wave structure.
//!
//! ## Quick Start
//!
//! ```rust
//! use swingwave::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! // Fixed-threshold ZigZag on closes, default confidence model
//! let engine = EngineBuilder::new()
//!     .detector(ZigZagSwingDetector::fixed(1.0).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let bars: Vec<Bar> = [10.0, 8.0, 6.0, 11.0, 13.0]
//!     .iter()
//!     .map(|&c| Bar { o: c, h: c, l: c, c, v: 0.0 })
//!     .collect();
//!
//! let analysis = engine.analyze(&bars, Some(ElliottPhase::Wave1), None).unwrap();
//! assert_eq!(analysis.detection.pivots.len(), 1);
//! ```

pub mod confidence;
pub mod detectors;
pub mod elliott;
pub mod filters;
pub mod num;
pub mod params;

pub mod prelude {
    pub use crate::{
        // Confidence
        confidence::*,
        // Detectors
        detectors::*,
        // Elliott vocabulary
        elliott::{ElliottChannel, ElliottDegree, ElliottPhase, ScenarioType},
        // Filters
        filters::{MinMagnitudeSwingFilter, SwingCompressor, SwingFilter},
        // Parameters
        params::{
            get_count, get_factor, get_period, get_ratio, ParamMeta, ParamType,
            ParameterizedDetector, ParameterizedFilter,
        },
        // Parallel
        analyze_parallel,
        AnalysisError,
        // Engine
        BuiltinSwingDetector,
        // Core traits
        DynSwingDetector,
        EngineBuilder,
        // Types
        ElliottSwing,
        InstrumentAnalysis,
        OHLCVExt,
        Period,
        PivotType,
        PriceSource,
        Ratio,
        Result,
        SwingAnalysis,
        SwingDetector,
        SwingDetectorResult,
        SwingEngine,
        // Errors
        SwingError,
        SwingPivot,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};

use confidence::{ConfidenceModel, ConfidenceProfiles, ElliottConfidenceBreakdown};
use elliott::{ElliottChannel, ElliottDegree, ElliottPhase, ScenarioType};
use filters::{SwingCompressor, SwingFilter};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SwingError>;

/// Errors raised while configuring detectors, filters and confidence models
#[derive(Debug, Clone, thiserror::Error)]
pub enum SwingError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SwingError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SwingError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SwingError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Blanket impl for references to dyn OHLCV
impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// (high + low + close) / 3
    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    /// (high + low) / 2
    #[inline]
    fn median_price(&self) -> f64 {
        (self.high() + self.low()) / 2.0
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(SwingError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(SwingError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(SwingError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Which bar price a detector reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    Typical,
    Median,
}

impl PriceSource {
    #[inline]
    pub fn price<T: OHLCV>(self, bar: &T) -> f64 {
        match self {
            PriceSource::Open => bar.open(),
            PriceSource::High => bar.high(),
            PriceSource::Low => bar.low(),
            PriceSource::Close => bar.close(),
            PriceSource::Typical => bar.typical_price(),
            PriceSource::Median => bar.median_price(),
        }
    }
}

// ============================================================
// SWING DATA MODEL
// ============================================================

/// Kind of confirmed pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PivotType {
    High,
    Low,
}

impl PivotType {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            PivotType::High => PivotType::Low,
            PivotType::Low => PivotType::High,
        }
    }

    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, PivotType::High)
    }
}

/// A confirmed local price extreme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPivot {
    pub index: usize,
    pub price: f64,
    pub pivot_type: PivotType,
}

impl SwingPivot {
    pub fn new(index: usize, price: f64, pivot_type: PivotType) -> Self {
        Self {
            index,
            price,
            pivot_type,
        }
    }

    pub fn high(index: usize, price: f64) -> Self {
        Self::new(index, price, PivotType::High)
    }

    pub fn low(index: usize, price: f64) -> Self {
        Self::new(index, price, PivotType::Low)
    }

    /// Whether `self` is at least as extreme as `other` for its type
    /// (higher-or-equal high, lower-or-equal low). Invalid prices never are.
    #[inline]
    pub fn is_at_least_as_extreme_as(&self, other: &SwingPivot) -> bool {
        match self.pivot_type {
            PivotType::High => self.price >= other.price,
            PivotType::Low => self.price <= other.price,
        }
    }
}

/// A directional leg between two consecutive pivots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElliottSwing {
    pub from_index: usize,
    pub to_index: usize,
    pub from_price: f64,
    pub to_price: f64,
    pub degree: ElliottDegree,
}

impl ElliottSwing {
    pub fn new(
        from_index: usize,
        to_index: usize,
        from_price: f64,
        to_price: f64,
        degree: ElliottDegree,
    ) -> Self {
        Self {
            from_index,
            to_index,
            from_price,
            to_price,
            degree,
        }
    }

    /// Leg between two pivots. `None` unless `to` comes strictly after `from`.
    pub fn from_pivots(from: &SwingPivot, to: &SwingPivot, degree: ElliottDegree) -> Option<Self> {
        (to.index > from.index)
            .then(|| Self::new(from.index, to.index, from.price, to.price, degree))
    }

    #[inline]
    pub fn is_rising(&self) -> bool {
        self.to_price > self.from_price
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.to_price < self.from_price
    }

    /// |to - from|, `NaN` when either end is invalid
    #[inline]
    pub fn amplitude(&self) -> f64 {
        if !num::is_valid(self.from_price) || !num::is_valid(self.to_price) {
            return f64::NAN;
        }
        (self.to_price - self.from_price).abs()
    }

    /// Duration in bars
    #[inline]
    pub fn length(&self) -> usize {
        self.to_index.saturating_sub(self.from_index)
    }
}

/// Detector output: normalized pivots and the legs between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingDetectorResult {
    pub pivots: Vec<SwingPivot>,
    pub swings: Vec<ElliottSwing>,
}

impl SwingDetectorResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalizes `pivots` and derives the swing legs from them.
    pub fn from_pivots(pivots: Vec<SwingPivot>, degree: ElliottDegree) -> Self {
        let pivots = detectors::normalize_pivots(pivots);
        let swings = detectors::swings_from_pivots(&pivots, degree);
        Self { pivots, swings }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    pub fn latest_pivot(&self) -> Option<&SwingPivot> {
        self.pivots.last()
    }

    pub fn pivot_indexes(&self) -> Vec<usize> {
        self.pivots.iter().map(|p| p.index).collect()
    }
}

// ============================================================
// SWING DETECTOR TRAITS
// ============================================================

/// Generic swing detector trait - for concrete types
pub trait SwingDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Detects swings using bars up to and including `index` (clamped to the
    /// last bar). An empty series gives an empty result.
    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        degree: ElliottDegree,
    ) -> SwingDetectorResult;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Object-safe swing detector trait - for custom detectors
pub trait DynSwingDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(
        &self,
        bars: &[&dyn OHLCV],
        index: usize,
        degree: ElliottDegree,
    ) -> SwingDetectorResult;
    fn validate_config(&self) -> Result<()>;
}

impl<D: SwingDetector> DynSwingDetector for D {
    fn name(&self) -> &'static str {
        SwingDetector::name(self)
    }

    fn detect(
        &self,
        bars: &[&dyn OHLCV],
        index: usize,
        degree: ElliottDegree,
    ) -> SwingDetectorResult {
        SwingDetector::detect(self, bars, index, degree)
    }

    fn validate_config(&self) -> Result<()> {
        SwingDetector::validate_config(self)
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinSwingDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch, composable inside
        /// [`CompositeSwingDetector`]
        #[derive(Debug, Clone)]
        pub enum BuiltinSwingDetector {
            $($variant($detector)),*
        }

        impl SwingDetector for BuiltinSwingDetector {
            #[inline]
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => SwingDetector::name(d)),*
                }
            }

            #[inline]
            fn detect<T: OHLCV>(
                &self,
                bars: &[T],
                index: usize,
                degree: ElliottDegree,
            ) -> SwingDetectorResult {
                match self {
                    $(Self::$variant(d) => SwingDetector::detect(d, bars, index, degree)),*
                }
            }

            fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => SwingDetector::validate_config(d)),*
                }
            }
        }

        $(
            impl From<$detector> for BuiltinSwingDetector {
                fn from(detector: $detector) -> Self {
                    Self::$variant(detector)
                }
            }

            impl From<$detector> for CompositeChild {
                fn from(detector: $detector) -> Self {
                    Self::Builtin(BuiltinSwingDetector::$variant(detector))
                }
            }
        )*
    };
}

define_builtin_detectors! {
    Fractal(FractalSwingDetector),
    ZigZag(ZigZagSwingDetector),
    AdaptiveZigZag(AdaptiveZigZagSwingDetector),
    Composite(CompositeSwingDetector),
}

// ============================================================
// SWING ENGINE
// ============================================================

/// Swings kept for scoring unless the builder says otherwise
pub const DEFAULT_SCENARIO_SWING_WINDOW: usize = 5;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub degree: ElliottDegree,
    pub validate_data: bool,
    /// Keep only the most recent N swings for scoring; `None` keeps all
    pub scenario_swing_window: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            degree: ElliottDegree::Minor,
            validate_data: false,
            scenario_swing_window: Some(DEFAULT_SCENARIO_SWING_WINDOW),
        }
    }
}

enum DetectorSlot {
    Builtin(BuiltinSwingDetector),
    Custom(Box<dyn DynSwingDetector>),
}

/// Everything one pipeline run produces for a series
#[derive(Debug, Clone, Serialize)]
pub struct SwingAnalysis {
    pub degree: ElliottDegree,
    pub index: usize,
    /// Raw detector output
    pub detection: SwingDetectorResult,
    /// Filtered and windowed swings that were scored
    pub swings: Vec<ElliottSwing>,
    pub channel: ElliottChannel,
    pub breakdown: ElliottConfidenceBreakdown,
}

/// Detect → filter → project channel → score
pub struct SwingEngine {
    detector: DetectorSlot,
    filters: Vec<Box<dyn SwingFilter>>,
    compressor: Option<SwingCompressor>,
    model: Box<dyn ConfidenceModel>,
    config: EngineConfig,
}

impl SwingEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &'static str {
        match &self.detector {
            DetectorSlot::Builtin(d) => SwingDetector::name(d),
            DetectorSlot::Custom(d) => d.name(),
        }
    }

    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Run the detector at a given bar index.
    pub fn detect_at<T: OHLCV>(&self, bars: &[T], index: usize) -> SwingDetectorResult {
        let degree = self.config.degree;
        let result = match &self.detector {
            DetectorSlot::Builtin(d) => SwingDetector::detect(d, bars, index, degree),
            DetectorSlot::Custom(d) => {
                let bar_refs: Vec<&dyn OHLCV> = bars.iter().map(|b| b as &dyn OHLCV).collect();
                d.detect(&bar_refs, index, degree)
            }
        };
        tracing::debug!(
            detector = self.detector_name(),
            index,
            pivots = result.pivots.len(),
            swings = result.swings.len(),
            "swing detection complete"
        );
        result
    }

    /// Run the detector at the last bar.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> SwingDetectorResult {
        match bars.len() {
            0 => SwingDetectorResult::empty(),
            len => self.detect_at(bars, len - 1),
        }
    }

    /// Apply the filter chain in order, then the compressor.
    pub fn filter(&self, swings: &[ElliottSwing]) -> Vec<ElliottSwing> {
        let mut processed = swings.to_vec();
        for filter in &self.filters {
            processed = filter.filter(&processed);
        }
        if let Some(compressor) = &self.compressor {
            processed = compressor.filter(&processed);
        }
        processed
    }

    /// Score a swing sequence with the engine's confidence model.
    pub fn score(
        &self,
        swings: &[ElliottSwing],
        phase: Option<ElliottPhase>,
        channel: Option<&ElliottChannel>,
        scenario_type: Option<ScenarioType>,
    ) -> ElliottConfidenceBreakdown {
        self.model.score(swings, phase, channel, scenario_type)
    }

    // ===========================================
    // HIGH-LEVEL: Full pipeline
    // ===========================================

    /// Full pipeline evaluated at the last bar.
    pub fn analyze<T: OHLCV>(
        &self,
        bars: &[T],
        phase: Option<ElliottPhase>,
        scenario_type: Option<ScenarioType>,
    ) -> Result<SwingAnalysis> {
        if bars.is_empty() {
            return Err(SwingError::InsufficientData { need: 1, got: 0 });
        }
        self.analyze_at(bars, bars.len() - 1, phase, scenario_type)
    }

    /// Full pipeline evaluated at `index` (clamped to the last bar).
    pub fn analyze_at<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        phase: Option<ElliottPhase>,
        scenario_type: Option<ScenarioType>,
    ) -> Result<SwingAnalysis> {
        if bars.is_empty() {
            return Err(SwingError::InsufficientData { need: 1, got: 0 });
        }
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let index = index.min(bars.len() - 1);
        let detection = self.detect_at(bars, index);
        let mut swings = self.filter(&detection.swings);
        if let Some(window) = self.config.scenario_swing_window {
            if swings.len() > window {
                swings.drain(..swings.len() - window);
            }
        }

        let channel = ElliottChannel::project(&swings, index);
        let breakdown = self.model.score(&swings, phase, Some(&channel), scenario_type);

        Ok(SwingAnalysis {
            degree: self.config.degree,
            index,
            detection,
            swings,
            channel,
            breakdown,
        })
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                SwingError::InvalidOHLCV { reason, .. } => {
                    SwingError::InvalidOHLCV { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match &self.detector {
            DetectorSlot::Builtin(d) => SwingDetector::validate_config(d)?,
            DetectorSlot::Custom(d) => d.validate_config()?,
        }
        if self.config.scenario_swing_window == Some(0) {
            return Err(SwingError::InvalidConfig(
                "scenario swing window must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SwingEngine instances
pub struct EngineBuilder {
    detector: DetectorSlot,
    filters: Vec<Box<dyn SwingFilter>>,
    compressor: Option<SwingCompressor>,
    model: Box<dyn ConfidenceModel>,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Adaptive ZigZag detector, no filters, default confidence model
    pub fn new() -> Self {
        Self {
            detector: DetectorSlot::Builtin(BuiltinSwingDetector::AdaptiveZigZag(
                AdaptiveZigZagSwingDetector::default(),
            )),
            filters: Vec::new(),
            compressor: None,
            model: Box::new(ConfidenceProfiles::default_model()),
            config: EngineConfig::default(),
        }
    }

    /// Use a builtin detector
    pub fn detector(mut self, detector: impl Into<BuiltinSwingDetector>) -> Self {
        self.detector = DetectorSlot::Builtin(detector.into());
        self
    }

    /// Use a custom detector (slow path)
    pub fn custom_detector<D: DynSwingDetector + 'static>(mut self, detector: D) -> Self {
        self.detector = DetectorSlot::Custom(Box::new(detector));
        self
    }

    /// Append a filter to the chain
    pub fn add_filter<F: SwingFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Drop short or small swings after the filter chain
    pub fn compressor(mut self, compressor: SwingCompressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn confidence_model<M: ConfidenceModel + 'static>(mut self, model: M) -> Self {
        self.model = Box::new(model);
        self
    }

    pub fn degree(mut self, degree: ElliottDegree) -> Self {
        self.config.degree = degree;
        self
    }

    /// Score only the most recent `window` swings
    pub fn scenario_swing_window(mut self, window: usize) -> Self {
        self.config.scenario_swing_window = Some(window);
        self
    }

    /// Score every filtered swing instead of the most recent window
    pub fn keep_all_swings(mut self) -> Self {
        self.config.scenario_swing_window = None;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SwingEngine> {
        let engine = SwingEngine {
            detector: self.detector,
            filters: self.filters,
            compressor: self.compressor,
            model: self.model,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug)]
pub struct InstrumentAnalysis {
    pub symbol: String,
    pub analysis: SwingAnalysis,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct AnalysisError {
    pub symbol: String,
    pub error: SwingError,
}

/// Parallel analysis of multiple instruments
pub fn analyze_parallel<'a, T, I>(
    engine: &SwingEngine,
    instruments: I,
    phase: Option<ElliottPhase>,
    scenario_type: Option<ScenarioType>,
) -> (Vec<InstrumentAnalysis>, Vec<AnalysisError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze(bars, phase, scenario_type)
                .map(|analysis| InstrumentAnalysis {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| AnalysisError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl Bar {
        fn flat(price: f64) -> Self {
            Self {
                o: price,
                h: price,
                l: price,
                c: price,
            }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
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
            1000.0
        }
    }

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        closes.iter().map(|&c| Bar::flat(c)).collect()
    }

    fn zigzag_bars() -> Vec<Bar> {
        bars_from(&[
            100.0, 104.0, 110.0, 106.0, 102.0, 108.0, 118.0, 125.0, 119.0, 115.0, 121.0, 130.0,
            124.0,
        ])
    }

    struct EveryOtherBar;

    impl SwingDetector for EveryOtherBar {
        fn name(&self) -> &'static str {
            "every_other_bar"
        }

        fn detect<T: OHLCV>(
            &self,
            bars: &[T],
            index: usize,
            degree: ElliottDegree,
        ) -> SwingDetectorResult {
            let end = index.min(bars.len().saturating_sub(1));
            let pivots = (0..=end)
                .step_by(2)
                .enumerate()
                .map(|(n, i)| {
                    let kind = if n % 2 == 0 { PivotType::Low } else { PivotType::High };
                    SwingPivot::new(i, bars[i].close(), kind)
                })
                .collect();
            SwingDetectorResult::from_pivots(pivots, degree)
        }
    }

    struct Misconfigured;

    impl SwingDetector for Misconfigured {
        fn name(&self) -> &'static str {
            "misconfigured"
        }

        fn detect<T: OHLCV>(
            &self,
            _bars: &[T],
            _index: usize,
            _degree: ElliottDegree,
        ) -> SwingDetectorResult {
            SwingDetectorResult::empty()
        }

        fn validate_config(&self) -> Result<()> {
            Err(SwingError::InvalidConfig("always broken".to_string()))
        }
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_swing_accessors() {
        let swing = ElliottSwing::new(3, 8, 100.0, 92.5, ElliottDegree::Minor);
        assert!(!swing.is_rising());
        assert!(swing.is_falling());
        assert_eq!(swing.amplitude(), 7.5);
        assert_eq!(swing.length(), 5);

        let broken = ElliottSwing::new(3, 8, f64::NAN, 92.5, ElliottDegree::Minor);
        assert!(broken.amplitude().is_nan());
    }

    #[test]
    fn test_swing_from_pivots_requires_forward_order() {
        let a = SwingPivot::low(4, 10.0);
        let b = SwingPivot::high(9, 15.0);
        assert!(ElliottSwing::from_pivots(&a, &b, ElliottDegree::Minor).is_some());
        assert!(ElliottSwing::from_pivots(&b, &a, ElliottDegree::Minor).is_none());
        assert!(ElliottSwing::from_pivots(&a, &a, ElliottDegree::Minor).is_none());
    }

    #[test]
    fn test_price_source() {
        let bar = Bar {
            o: 10.0,
            h: 14.0,
            l: 8.0,
            c: 12.0,
        };
        assert_eq!(PriceSource::High.price(&bar), 14.0);
        assert_eq!(PriceSource::Median.price(&bar), 11.0);
        assert!((PriceSource::Typical.price(&bar) - 34.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_engine_builder_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.detector_name(), "adaptive_zigzag");
    }

    #[test]
    fn test_engine_rejects_zero_window() {
        let result = EngineBuilder::new().scenario_swing_window(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_engine_rejects_invalid_detector_config() {
        let result = EngineBuilder::new().custom_detector(Misconfigured).build();
        assert!(matches!(result, Err(SwingError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_detect() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars: Vec<Bar> = vec![];
        assert!(engine.detect(&bars).is_empty());
        assert!(engine.analyze(&bars, None, None).is_err());
    }

    #[test]
    fn test_analyze_pipeline() {
        let engine = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .build()
            .unwrap();

        let bars = zigzag_bars();
        let analysis = engine
            .analyze(&bars, Some(ElliottPhase::Wave5), Some(ScenarioType::Impulse))
            .unwrap();

        assert_eq!(analysis.index, bars.len() - 1);
        assert_eq!(analysis.detection.pivots.len(), 5);
        assert_eq!(analysis.swings.len(), 4);
        assert!((0.0..=1.0).contains(&analysis.breakdown.overall));
    }

    #[test]
    fn test_scenario_window_keeps_latest_swings() {
        let engine = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .scenario_swing_window(2)
            .build()
            .unwrap();

        let analysis = engine.analyze(&zigzag_bars(), None, None).unwrap();
        assert_eq!(analysis.swings.len(), 2);
        assert_eq!(analysis.swings.last(), analysis.detection.swings.last());
    }

    #[test]
    fn test_default_window_keeps_five_swings() {
        let engine = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .build()
            .unwrap();
        assert_eq!(engine.config().scenario_swing_window, Some(DEFAULT_SCENARIO_SWING_WINDOW));

        let closes: Vec<f64> = (0..12).map(|i| if i % 2 == 0 { 100.0 } else { 110.0 }).collect();
        let bars = bars_from(&closes);
        let analysis = engine.analyze(&bars, None, None).unwrap();
        assert_eq!(analysis.detection.swings.len(), 9);
        assert_eq!(analysis.swings.len(), 5);
        assert_eq!(analysis.swings[..], analysis.detection.swings[4..]);

        let unbounded = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .keep_all_swings()
            .build()
            .unwrap();
        assert_eq!(unbounded.analyze(&bars, None, None).unwrap().swings.len(), 9);
    }

    #[test]
    fn test_compressor_runs_after_filters() {
        let engine = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .add_filter(|swings: &[ElliottSwing]| -> Vec<ElliottSwing> {
                swings.iter().filter(|s| s.is_rising()).copied().collect()
            })
            .compressor(SwingCompressor::new(20.0, 3).unwrap())
            .build()
            .unwrap();

        // rising legs: 102 -> 125 over 3 bars, 115 -> 130 over 2 bars
        let analysis = engine.analyze(&zigzag_bars(), None, None).unwrap();
        assert_eq!(analysis.swings.len(), 1);
        assert_eq!(analysis.swings[0].from_index, 4);
        assert_eq!(analysis.swings[0].to_index, 7);
    }

    #[test]
    fn test_custom_detector_slow_path() {
        let engine = EngineBuilder::new().custom_detector(EveryOtherBar).build().unwrap();
        let bars = zigzag_bars();
        let result = engine.detect(&bars);
        assert_eq!(engine.detector_name(), "every_other_bar");
        assert_eq!(result.pivots.len(), 7);
        assert_eq!(result.swings.len(), 6);
    }

    #[test]
    fn test_validate_data_reports_index() {
        let engine = EngineBuilder::new().validate_data(true).build().unwrap();
        let mut bars = zigzag_bars();
        bars[4].c = f64::NAN;
        match engine.analyze(&bars, None, None) {
            Err(SwingError::InvalidOHLCV { index, .. }) => assert_eq!(index, 4),
            other => panic!("expected InvalidOHLCV, got {other:?}"),
        }
    }

    #[test]
    fn test_parallel_analysis() {
        let engine = EngineBuilder::new()
            .detector(ZigZagSwingDetector::fixed(3.0).unwrap())
            .build()
            .unwrap();

        let bars1 = zigzag_bars();
        let bars2: Vec<Bar> = vec![];

        let instruments: Vec<(&str, &[Bar])> = vec![("AAPL", &bars1), ("EMPTY", &bars2)];

        let (results, errors) = analyze_parallel(&engine, instruments, None, None);
        assert_eq!(results.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "EMPTY");
    }
}

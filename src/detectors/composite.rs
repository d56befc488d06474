//! N-way composite of swing detectors

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    num, BuiltinSwingDetector, ElliottDegree, PivotType, Result, SwingDetector,
    SwingDetectorResult, SwingError, SwingPivot, OHLCV,
};

/// How child pivots are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositePolicy {
    /// Keep a pivot only when every child reports the same (bar, type)
    #[default]
    And,
    /// Keep any pivot reported by at least one child
    Or,
}

/// One member of a composite: a builtin detector, dispatched statically,
/// or any object-safe detector behind an `Arc`
#[derive(Clone)]
pub enum CompositeChild {
    Builtin(BuiltinSwingDetector),
    Custom(Arc<dyn crate::DynSwingDetector>),
}

impl CompositeChild {
    pub fn custom<D: crate::DynSwingDetector + 'static>(detector: D) -> Self {
        Self::Custom(Arc::new(detector))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Builtin(d) => SwingDetector::name(d),
            Self::Custom(d) => d.name(),
        }
    }

    fn validate_config(&self) -> Result<()> {
        match self {
            Self::Builtin(d) => SwingDetector::validate_config(d),
            Self::Custom(d) => d.validate_config(),
        }
    }
}

impl fmt::Debug for CompositeChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(d) => f.debug_tuple("Builtin").field(d).finish(),
            Self::Custom(d) => f.debug_tuple("Custom").field(&d.name()).finish(),
        }
    }
}

impl From<BuiltinSwingDetector> for CompositeChild {
    fn from(detector: BuiltinSwingDetector) -> Self {
        Self::Builtin(detector)
    }
}

/// Combines child detectors under a [`CompositePolicy`]. The merged price
/// of a pivot is the most extreme price the children report for it.
#[derive(Debug, Clone)]
pub struct CompositeSwingDetector {
    policy: CompositePolicy,
    children: Vec<CompositeChild>,
}

impl CompositeSwingDetector {
    pub fn new(policy: CompositePolicy, children: Vec<CompositeChild>) -> Result<Self> {
        let detector = Self { policy, children };
        detector.check()?;
        Ok(detector)
    }

    pub fn and(children: Vec<CompositeChild>) -> Result<Self> {
        Self::new(CompositePolicy::And, children)
    }

    pub fn or(children: Vec<CompositeChild>) -> Result<Self> {
        Self::new(CompositePolicy::Or, children)
    }

    pub fn policy(&self) -> CompositePolicy {
        self.policy
    }

    pub fn children(&self) -> &[CompositeChild] {
        &self.children
    }

    fn check(&self) -> Result<()> {
        if self.children.is_empty() {
            return Err(SwingError::InvalidConfig(
                "composite detector needs at least one child".to_string(),
            ));
        }
        Ok(())
    }
}

type PivotKey = (usize, PivotType);

fn more_extreme(kind: PivotType, a: f64, b: f64) -> f64 {
    match kind {
        PivotType::High => num::max_valid(a, b),
        PivotType::Low => num::min_valid(a, b),
    }
}

fn merge_into(target: &mut BTreeMap<PivotKey, f64>, pivot: &SwingPivot) {
    let key = (pivot.index, pivot.pivot_type);
    target
        .entry(key)
        .and_modify(|price| *price = more_extreme(pivot.pivot_type, *price, pivot.price))
        .or_insert(pivot.price);
}

impl SwingDetector for CompositeSwingDetector {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        degree: ElliottDegree,
    ) -> SwingDetectorResult {
        if bars.is_empty() {
            return SwingDetectorResult::empty();
        }

        // built once, on the first custom child
        let mut bar_refs: Option<Vec<&dyn OHLCV>> = None;
        let mut results: Vec<SwingDetectorResult> = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let result = match child {
                CompositeChild::Builtin(d) => SwingDetector::detect(d, bars, index, degree),
                CompositeChild::Custom(d) => {
                    let refs = bar_refs
                        .get_or_insert_with(|| bars.iter().map(|b| b as &dyn OHLCV).collect());
                    d.detect(refs, index, degree)
                }
            };
            results.push(result);
        }

        let mut merged: BTreeMap<PivotKey, f64> = BTreeMap::new();
        let mut votes: BTreeMap<PivotKey, usize> = BTreeMap::new();
        for result in &results {
            for pivot in &result.pivots {
                merge_into(&mut merged, pivot);
                *votes.entry((pivot.index, pivot.pivot_type)).or_insert(0) += 1;
            }
        }

        let required = match self.policy {
            CompositePolicy::And => results.len(),
            CompositePolicy::Or => 1,
        };
        let pivots: Vec<SwingPivot> = merged
            .into_iter()
            .filter(|(key, _)| votes.get(key).copied().unwrap_or(0) >= required)
            .map(|((index, kind), price)| SwingPivot::new(index, price, kind))
            .collect();

        tracing::debug!(
            policy = ?self.policy,
            children = self.children.len(),
            pivots = pivots.len(),
            "composite merge"
        );
        SwingDetectorResult::from_pivots(pivots, degree)
    }

    fn validate_config(&self) -> Result<()> {
        self.check()?;
        for child in &self.children {
            child.validate_config()?;
        }
        Ok(())
    }
}

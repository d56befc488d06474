//! Swing detectors
//!
//! Interchangeable strategies behind [`crate::SwingDetector`]:
//!
//! - **Fractal**: fixed lookback/lookforward window, plateau tolerant
//! - **ZigZag**: reversal state machine with a fixed, ATR or external threshold
//! - **Adaptive ZigZag**: ATR-driven threshold with smoothing and bounds
//! - **Composite**: AND/OR combination of any builtin detectors

pub mod helpers;

pub mod adaptive;
pub mod composite;
pub mod fractal;
pub mod zigzag;

// Re-export all detectors for convenience
pub use adaptive::*;
pub use composite::*;
pub use fractal::*;
pub use helpers::*;
pub use zigzag::*;

//! Core data structures for photometric time series.

mod folded;
mod light_curve;

pub use folded::FoldedLightCurve;
pub use light_curve::{Breakpoints, LightCurve};

//! Phase-folded light curve.

use serde::Serialize;

/// Flux against orbital phase in `(-0.5, 0.5]`, sorted by phase.
///
/// Produced by [`fold`](crate::transform::fold::fold); binning produces the
/// same type with one row per non-empty bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldedLightCurve {
    phase: Vec<f64>,
    flux: Vec<f64>,
    period: f64,
    t0: f64,
}

impl FoldedLightCurve {
    /// Callers must pass phase-sorted rows of equal length.
    pub(crate) fn from_sorted(phase: Vec<f64>, flux: Vec<f64>, period: f64, t0: f64) -> Self {
        debug_assert_eq!(phase.len(), flux.len());
        Self {
            phase,
            flux,
            period,
            t0,
        }
    }

    pub fn phase(&self) -> &[f64] {
        &self.phase
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Folding period, days.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Epoch that maps to phase zero.
    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn len(&self) -> usize {
        self.phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
    }

    /// Phase converted to time from mid-transit, days.
    pub fn time_from_center(&self) -> Vec<f64> {
        self.phase.iter().map(|p| p * self.period).collect()
    }

    /// Iterate over `(phase, flux)` rows.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.phase.iter().copied().zip(self.flux.iter().copied())
    }
}

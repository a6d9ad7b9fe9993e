//! Phase folding and binning.
//!
//! `phase = ((t - t0) / period) mod 1`, shifted into `(-0.5, 0.5]` so that
//! the feature at `t0` sits at phase zero. Binned values use the median, so
//! a handful of outliers cannot drag a bin.

use crate::core::{FoldedLightCurve, LightCurve};
use crate::error::{LightCurveError, Result};
use crate::transform::window::median_filter;
use crate::utils::stats::median;

/// Phase of `time` in `(-0.5, 0.5]`.
pub fn phase_of(time: f64, period: f64, t0: f64) -> f64 {
    let phase = ((time - t0) / period).rem_euclid(1.0);
    if phase > 0.5 {
        phase - 1.0
    } else {
        phase
    }
}

/// Fold a light curve at `period` with epoch `t0`.
///
/// Rows are sorted by phase; rows with equal phase keep their input order.
/// An empty light curve folds to an empty result.
pub fn fold(lc: &LightCurve, period: f64, t0: f64) -> Result<FoldedLightCurve> {
    if !(period.is_finite() && period > 0.0) {
        return Err(LightCurveError::InvalidParameter(format!(
            "fold period must be positive and finite, got {}",
            period
        )));
    }
    if !t0.is_finite() {
        return Err(LightCurveError::InvalidParameter(format!(
            "fold epoch must be finite, got {}",
            t0
        )));
    }

    let phases: Vec<f64> = lc.time().iter().map(|&t| phase_of(t, period, t0)).collect();
    let mut order: Vec<usize> = (0..phases.len()).collect();
    order.sort_by(|&a, &b| phases[a].total_cmp(&phases[b]));

    let phase = order.iter().map(|&i| phases[i]).collect();
    let flux = order.iter().map(|&i| lc.flux()[i]).collect();
    Ok(FoldedLightCurve::from_sorted(phase, flux, period, t0))
}

/// Median flux in `n_bins` equal-width phase bins across `(-0.5, 0.5]`.
///
/// Each row is `(bin_center, median_flux)`; empty bins are omitted.
pub fn bin(folded: &FoldedLightCurve, n_bins: usize) -> Result<FoldedLightCurve> {
    if n_bins == 0 {
        return Err(LightCurveError::InvalidParameter(
            "n_bins must be at least 1".into(),
        ));
    }

    let width = 1.0 / n_bins as f64;
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
    for (phase, flux) in folded.iter() {
        let k = (((phase + 0.5) / width) as usize).min(n_bins - 1);
        buckets[k].push(flux);
    }

    let mut centers = Vec::new();
    let mut medians = Vec::new();
    for (k, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        centers.push(-0.5 + (k as f64 + 0.5) * width);
        medians.push(median(bucket));
    }

    Ok(FoldedLightCurve::from_sorted(
        centers,
        medians,
        folded.period(),
        folded.t0(),
    ))
}

/// Median phase and flux of consecutive groups of `size` rows.
///
/// The last group may be shorter.
pub fn bin_by_count(folded: &FoldedLightCurve, size: usize) -> Result<FoldedLightCurve> {
    if size == 0 {
        return Err(LightCurveError::InvalidParameter(
            "group size must be at least 1".into(),
        ));
    }

    let phase = folded.phase().chunks(size).map(median).collect();
    let flux = folded.flux().chunks(size).map(median).collect();
    Ok(FoldedLightCurve::from_sorted(
        phase,
        flux,
        folded.period(),
        folded.t0(),
    ))
}

/// Running median of the folded flux over `window` rows.
pub fn running_median(folded: &FoldedLightCurve, window: usize) -> Vec<f64> {
    median_filter(folded.flux(), window)
}

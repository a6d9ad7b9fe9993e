//! Autocorrelation of a power spectrum.
//!
//! Regularly spaced oscillation modes show up as a comb in the spectrum and
//! as peaks at multiples of the spacing in its autocorrelation. The output is
//! centered ("same" mode): it has the length of the spectrum with zero lag in
//! the middle.

use super::fft::linear_autocorrelation;
use super::spectrum::PowerSpectrum;
use serde::Serialize;
use tracing::debug;

/// Centered autocorrelation of a power spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutocorrelationResult {
    /// Lag axis, `linspace(-f_max, f_max, len)` with `f_max` the highest
    /// spectrum frequency.
    lag_freq: Vec<f64>,
    /// Correlation values, even about the center.
    acf: Vec<f64>,
    /// Frequency offset between neighbouring output samples (the spectrum bin
    /// width).
    lag_step: f64,
}

impl AutocorrelationResult {
    pub fn lag_freq(&self) -> &[f64] {
        &self.lag_freq
    }

    pub fn acf(&self) -> &[f64] {
        &self.acf
    }

    pub fn len(&self) -> usize {
        self.acf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acf.is_empty()
    }

    /// Frequency offset (µHz) that output index `i` actually correlates.
    ///
    /// This is `(i - (len - 1) / 2) · bin_width`; the display axis
    /// [`lag_freq`](Self::lag_freq) is stretched to span the whole spectrum.
    pub fn offset_of(&self, i: usize) -> f64 {
        (i as f64 - (self.acf.len() as f64 - 1.0) / 2.0) * self.lag_step
    }

    /// ACF divided by its zero-lag value.
    pub fn normalized(&self) -> Vec<f64> {
        let center = self.acf.iter().cloned().fold(0.0, f64::max);
        if center <= 0.0 {
            return vec![0.0; self.acf.len()];
        }
        self.acf.iter().map(|v| v / center).collect()
    }

    /// Strongest local maximum whose frequency offset lies in
    /// `[min_offset, max_offset]` (µHz), as `(offset, acf)`.
    ///
    /// Used as the mode-spacing estimate. Returns `None` when the band holds
    /// no local maximum.
    pub fn spacing_peak(&self, min_offset: f64, max_offset: f64) -> Option<(f64, f64)> {
        let mut best: Option<(f64, f64)> = None;
        for i in 1..self.acf.len().saturating_sub(1) {
            let offset = self.offset_of(i);
            if offset < min_offset || offset > max_offset {
                continue;
            }
            let value = self.acf[i];
            if value > self.acf[i - 1] && value >= self.acf[i + 1] {
                match best {
                    Some((_, b)) if b >= value => {}
                    _ => best = Some((offset, value)),
                }
            }
        }
        best
    }
}

/// Autocorrelate the spectrum power with itself.
///
/// No normalization or detrending is applied. For an even length the center
/// falls between two integer lags and each output is the mean of the two
/// neighbouring integer-lag sums, which keeps the result exactly symmetric.
pub fn autocorrelate(spectrum: &PowerSpectrum) -> AutocorrelationResult {
    let n = spectrum.len();
    let by_lag = linear_autocorrelation(spectrum.power());

    let half = n / 2;
    let acf: Vec<f64> = if n.is_multiple_of(2) {
        (0..n)
            .map(|i| 0.5 * (by_lag[i.abs_diff(half)] + by_lag[(i + 1).abs_diff(half)]))
            .collect()
    } else {
        (0..n).map(|i| by_lag[i.abs_diff(half)]).collect()
    };

    let f_max = spectrum.max_frequency();
    let span = (n - 1) as f64;
    let lag_freq: Vec<f64> = (0..n)
        .map(|i| f_max * (2.0 * i as f64 - span) / span)
        .collect();

    debug!(len = n, "autocorrelated power spectrum");

    AutocorrelationResult {
        lag_freq,
        acf,
        lag_step: spectrum.bin_width(),
    }
}

//! Power spectrum of a cleaned light curve in micro-Hertz.
//!
//! Wraps the Lomb-Scargle periodogram with the conventions used for stellar
//! oscillation work: frequencies in µHz, flux in parts per million, and a
//! normalization where the spectrum integrates to twice the flux variance
//! (`Σ power · Δf = 2 · var(flux · 1e6)`).

use super::lomb_scargle::{grid_size, lomb_scargle, PeriodogramMethod};
use crate::core::LightCurve;
use crate::error::{LightCurveError, Result};
use crate::transform::window::gaussian_filter;
use crate::utils::stats::population_variance;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Micro-Hertz per cycle/day (`1e6 / 86400`).
pub const UHZ_PER_CYCLE_PER_DAY: f64 = 1e6 / 86_400.0;

/// Scale applied to relative flux before computing its variance (ppm).
pub const PPM: f64 = 1e6;

/// Spectral analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Grid oversampling relative to the natural resolution `1 / baseline`.
    pub oversample_factor: f64,
    /// Nyquist-like frequency of the observing cadence, µHz.
    pub nyquist_uhz: f64,
    /// Extra range kept above the Nyquist frequency, µHz.
    pub margin_uhz: f64,
    /// Periodogram evaluator.
    pub method: PeriodogramMethod,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            oversample_factor: 5.0,
            nyquist_uhz: 283.0,
            margin_uhz: 150.0,
            method: PeriodogramMethod::Fast,
        }
    }
}

impl SpectrumConfig {
    /// Defaults with the Nyquist frequency of a regular cadence (in days).
    pub fn for_cadence(cadence_days: f64) -> Self {
        Self {
            nyquist_uhz: UHZ_PER_CYCLE_PER_DAY / (2.0 * cadence_days),
            ..Default::default()
        }
    }

    /// Set the oversampling factor.
    pub fn with_oversample(mut self, oversample_factor: f64) -> Self {
        self.oversample_factor = oversample_factor;
        self
    }

    /// Set the margin above Nyquist.
    pub fn with_margin(mut self, margin_uhz: f64) -> Self {
        self.margin_uhz = margin_uhz;
        self
    }

    /// Set the periodogram evaluator.
    pub fn with_method(mut self, method: PeriodogramMethod) -> Self {
        self.method = method;
        self
    }

    /// Exclusive upper frequency of the spectrum, µHz.
    pub fn max_frequency(&self) -> f64 {
        self.nyquist_uhz + self.margin_uhz
    }
}

/// A normalized power spectrum.
///
/// `freq` is strictly increasing (µHz) and `power` is non-negative; both have
/// the same length, at least 2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSpectrum {
    freq: Vec<f64>,
    power: Vec<f64>,
}

impl PowerSpectrum {
    /// Build a spectrum from parallel arrays, checking its invariants.
    pub fn new(freq: Vec<f64>, power: Vec<f64>) -> Result<Self> {
        if freq.len() != power.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: freq.len(),
                got: power.len(),
            });
        }
        if freq.len() < 2 {
            return Err(LightCurveError::InsufficientData {
                needed: 2,
                got: freq.len(),
            });
        }
        if freq.windows(2).any(|w| w[1] <= w[0] || w[1].is_nan()) {
            return Err(LightCurveError::InvalidParameter(
                "spectrum frequencies must be strictly increasing".into(),
            ));
        }
        if power.iter().any(|p| p.is_nan() || *p < 0.0) {
            return Err(LightCurveError::InvalidParameter(
                "spectrum power must be non-negative".into(),
            ));
        }
        Ok(Self { freq, power })
    }

    /// Frequencies, µHz.
    pub fn freq(&self) -> &[f64] {
        &self.freq
    }

    /// Power density, ppm² / µHz.
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// Frequency resolution, `freq[1] - freq[0]`.
    pub fn bin_width(&self) -> f64 {
        self.freq[1] - self.freq[0]
    }

    /// Highest frequency in the spectrum.
    pub fn max_frequency(&self) -> f64 {
        self.freq[self.freq.len() - 1]
    }

    /// `Σ power · Δf`.
    pub fn integrated_power(&self) -> f64 {
        self.power.iter().sum::<f64>() * self.bin_width()
    }

    /// Strongest peak as `(frequency, power)`. The lowest frequency wins ties.
    pub fn peak(&self) -> (f64, f64) {
        let mut best = 0;
        for (i, &p) in self.power.iter().enumerate() {
            if p > self.power[best] {
                best = i;
            }
        }
        (self.freq[best], self.power[best])
    }

    /// Power divided by its maximum (all zeros for a flat-zero spectrum).
    pub fn max_normalized(&self) -> Vec<f64> {
        let (_, max) = self.peak();
        if max <= 0.0 {
            return vec![0.0; self.power.len()];
        }
        self.power.iter().map(|p| p / max).collect()
    }

    /// Gaussian-smoothed power, `sigma_bins` in frequency bins.
    ///
    /// Heavy smoothing approximates the granulation background.
    pub fn smoothed(&self, sigma_bins: f64) -> Vec<f64> {
        gaussian_filter(&self.power, sigma_bins)
    }
}

/// Compute the power spectrum up to `max_frequency` (µHz, exclusive).
pub fn power_spectrum(
    lc: &LightCurve,
    oversample_factor: f64,
    max_frequency: f64,
) -> Result<PowerSpectrum> {
    power_spectrum_with_method(lc, oversample_factor, max_frequency, PeriodogramMethod::Fast)
}

/// Compute the power spectrum described by `config`.
pub fn analyze(lc: &LightCurve, config: &SpectrumConfig) -> Result<PowerSpectrum> {
    power_spectrum_with_method(
        lc,
        config.oversample_factor,
        config.max_frequency(),
        config.method,
    )
}

fn power_spectrum_with_method(
    lc: &LightCurve,
    oversample_factor: f64,
    max_frequency: f64,
    method: PeriodogramMethod,
) -> Result<PowerSpectrum> {
    let n = lc.len();
    if n < 2 {
        return Err(LightCurveError::InsufficientData { needed: 2, got: n });
    }
    if !(max_frequency.is_finite() && max_frequency > 0.0) {
        return Err(LightCurveError::InvalidParameter(format!(
            "max_frequency must be positive, got {}",
            max_frequency
        )));
    }
    if !(oversample_factor.is_finite() && oversample_factor > 0.0) {
        return Err(LightCurveError::InvalidParameter(format!(
            "oversample_factor must be positive, got {}",
            oversample_factor
        )));
    }

    let n_freq = grid_size(
        lc.baseline(),
        oversample_factor,
        max_frequency / UHZ_PER_CYCLE_PER_DAY,
    );
    if n_freq < 2 {
        return Err(LightCurveError::InsufficientData {
            needed: 2,
            got: n_freq,
        });
    }

    let periodogram = lomb_scargle(lc.time(), lc.flux(), oversample_factor, n_freq, method)?;

    let (freq, raw): (Vec<f64>, Vec<f64>) = periodogram
        .frequency
        .iter()
        .zip(&periodogram.power)
        .map(|(&f, &p)| (f * UHZ_PER_CYCLE_PER_DAY, p))
        .filter(|&(f, _)| f < max_frequency)
        .unzip();
    if freq.len() < 2 {
        return Err(LightCurveError::InsufficientData {
            needed: 2,
            got: freq.len(),
        });
    }

    let bin = freq[1] - freq[0];
    let scaled: Vec<f64> = lc.flux().iter().map(|f| f * PPM).collect();
    let flux_variance = population_variance(&scaled);
    let total: f64 = raw.iter().sum();

    let power: Vec<f64> = if total > 0.0 && total.is_finite() && flux_variance > 0.0 {
        raw.iter()
            .map(|p| 2.0 * p * flux_variance / (total * bin))
            .collect()
    } else {
        vec![0.0; raw.len()]
    };

    debug!(
        samples = n,
        frequencies = freq.len(),
        bin_width_uhz = bin,
        ?method,
        "computed power spectrum"
    );

    Ok(PowerSpectrum { freq, power })
}

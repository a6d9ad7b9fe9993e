//! Lomb-Scargle periodogram for irregularly sampled series.
//!
//! Each frequency gets a least-squares sinusoid fit, so gaps and uneven
//! cadence are handled without resampling. Two evaluators share the same
//! grid and normalization:
//!
//! - [`lomb_scargle_fast`]: Press & Rybicki (1989). Samples are
//!   "extirpolated" onto a regular mesh with Lagrange weights, and all the
//!   trigonometric sums come out of two FFTs. O(N + M log M).
//! - [`lomb_scargle_direct`]: the same sums evaluated exactly. O(N · M).
//!
//! The grid is `f_j = j · df` for `j = 1..=n_freq` with
//! `df = 1 / (baseline · oversample)`, in cycles per unit of input time.

use super::fft::fft_in_place;
use crate::error::{LightCurveError, Result};
use crate::utils::stats::{mean, variance};
use rustfft::{num_complex::Complex64, FftDirection};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of mesh points each sample is spread over during extirpolation.
const MACC: usize = 4;

/// How the periodogram sums are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeriodogramMethod {
    /// Extirpolation + FFT.
    #[default]
    Fast,
    /// Exact per-frequency sums.
    Direct,
}

/// A Lomb-Scargle periodogram on a uniform frequency grid.
#[derive(Debug, Clone)]
pub struct LombScargle {
    /// Frequencies in cycles per unit of input time, ascending.
    pub frequency: Vec<f64>,
    /// Normalized Lomb-Scargle power (divided by twice the sample variance).
    pub power: Vec<f64>,
    /// Number of input samples.
    pub n_samples: usize,
    /// Oversampling factor used to build the grid.
    pub oversample: f64,
}

impl LombScargle {
    /// Frequency spacing of the grid.
    pub fn frequency_step(&self) -> f64 {
        match self.frequency.as_slice() {
            [first, second, ..] => second - first,
            [only] => *only,
            [] => 0.0,
        }
    }

    /// Highest peak as `(index, frequency, power)`.
    pub fn peak(&self) -> Option<(usize, f64, f64)> {
        self.power
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, p)| (i, self.frequency[i], p))
    }

    /// False-alarm probability of the highest peak against white noise.
    ///
    /// Uses `2 · n_freq / oversample` independent frequencies.
    pub fn false_alarm_probability(&self) -> f64 {
        let Some((_, _, p_max)) = self.peak() else {
            return 1.0;
        };
        let independent = 2.0 * self.frequency.len() as f64 / self.oversample;
        false_alarm_probability(p_max, independent)
    }
}

/// Probability that pure noise produces a normalized peak at least `power`
/// high among `independent` frequencies: `1 - (1 - e^-p)^M`.
pub fn false_alarm_probability(power: f64, independent: f64) -> f64 {
    if !power.is_finite() || power <= 0.0 {
        return 1.0;
    }
    let single = (-power).exp();
    let prob = -(independent * (-single).ln_1p()).exp_m1();
    prob.clamp(0.0, 1.0)
}

/// Number of grid frequencies strictly below `max_frequency`.
pub fn grid_size(baseline: f64, oversample: f64, max_frequency: f64) -> usize {
    if baseline <= 0.0 || oversample <= 0.0 || max_frequency <= 0.0 {
        return 0;
    }
    let df = 1.0 / (baseline * oversample);
    let ratio = max_frequency / df;
    let n = ratio.ceil() as usize;
    n.saturating_sub(1)
}

/// Compute the periodogram with the requested method.
pub fn lomb_scargle(
    time: &[f64],
    values: &[f64],
    oversample: f64,
    n_freq: usize,
    method: PeriodogramMethod,
) -> Result<LombScargle> {
    match method {
        PeriodogramMethod::Fast => lomb_scargle_fast(time, values, oversample, n_freq),
        PeriodogramMethod::Direct => lomb_scargle_direct(time, values, oversample, n_freq),
    }
}

/// Exact Lomb-Scargle evaluation.
pub fn lomb_scargle_direct(
    time: &[f64],
    values: &[f64],
    oversample: f64,
    n_freq: usize,
) -> Result<LombScargle> {
    let setup = Setup::new(time, values, oversample)?;
    let n = time.len() as f64;

    let power = (1..=n_freq)
        .map(|j| {
            let omega = 2.0 * PI * j as f64 * setup.df;
            let (mut c, mut s, mut c2, mut s2) = (0.0, 0.0, 0.0, 0.0);
            for (&t, &y) in time.iter().zip(values) {
                let arg = omega * (t - setup.t_min);
                let (sin, cos) = arg.sin_cos();
                let dy = y - setup.mean;
                c += dy * cos;
                s += dy * sin;
                // cos 2x = cos² - sin², sin 2x = 2 sin cos
                c2 += cos * cos - sin * sin;
                s2 += 2.0 * sin * cos;
            }
            normalized_power(
                Complex64::new(c, s),
                Complex64::new(c2, s2),
                n,
                setup.variance,
            )
        })
        .collect();

    Ok(setup.finish(power, n_freq, time.len()))
}

/// Fast Lomb-Scargle evaluation by extirpolation and FFT.
pub fn lomb_scargle_fast(
    time: &[f64],
    values: &[f64],
    oversample: f64,
    n_freq: usize,
) -> Result<LombScargle> {
    let setup = Setup::new(time, values, oversample)?;
    let n = time.len() as f64;

    // Mesh large enough that the highest requested frequency sits well below
    // its Nyquist index; the 2x is for the doubled-angle sums.
    let mesh = 2 * (2 * n_freq * MACC).max(64).next_power_of_two();
    let mesh_f = mesh as f64;
    let scale = mesh_f * setup.df;

    let mut data = vec![0.0; mesh];
    let mut unit = vec![0.0; mesh];
    for (&t, &y) in time.iter().zip(values) {
        let position = ((t - setup.t_min) * scale) % mesh_f;
        let doubled = (2.0 * position) % mesh_f;
        extirpolate(y - setup.mean, &mut data, position);
        extirpolate(1.0, &mut unit, doubled);
    }

    let mut sums: Vec<Complex64> = data.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut sums2: Vec<Complex64> = unit.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    fft_in_place(&mut sums, FftDirection::Inverse);
    fft_in_place(&mut sums2, FftDirection::Inverse);

    let power = (1..=n_freq)
        .map(|j| normalized_power(sums[j], sums2[j], n, setup.variance))
        .collect();

    Ok(setup.finish(power, n_freq, time.len()))
}

/// Validated inputs shared by both evaluators.
struct Setup {
    t_min: f64,
    df: f64,
    mean: f64,
    variance: f64,
    oversample: f64,
}

impl Setup {
    fn new(time: &[f64], values: &[f64], oversample: f64) -> Result<Self> {
        if time.len() != values.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: time.len(),
                got: values.len(),
            });
        }
        if time.len() < 2 {
            return Err(LightCurveError::InsufficientData {
                needed: 2,
                got: time.len(),
            });
        }
        if !(oversample.is_finite() && oversample > 0.0) {
            return Err(LightCurveError::InvalidParameter(format!(
                "oversample factor must be positive, got {}",
                oversample
            )));
        }
        let t_min = time[0];
        let baseline = time[time.len() - 1] - t_min;
        if !(baseline.is_finite() && baseline > 0.0) {
            return Err(LightCurveError::InvalidParameter(format!(
                "time baseline must be positive, got {}",
                baseline
            )));
        }

        Ok(Self {
            t_min,
            df: 1.0 / (baseline * oversample),
            mean: mean(values),
            variance: variance(values),
            oversample,
        })
    }

    fn finish(self, power: Vec<f64>, n_freq: usize, n_samples: usize) -> LombScargle {
        LombScargle {
            frequency: (1..=n_freq).map(|j| j as f64 * self.df).collect(),
            power,
            n_samples,
            oversample: self.oversample,
        }
    }
}

/// Lomb-Scargle power from the complex sums
/// `sum = Σ (y - ȳ) e^{iωt}` and `sum2 = Σ e^{2iωt}`.
fn normalized_power(sum: Complex64, sum2: Complex64, n: f64, variance: f64) -> f64 {
    if variance.is_nan() || variance <= 0.0 {
        return 0.0;
    }

    let hypot = sum2.norm();
    // cos(2ωτ)/2 and sin(2ωτ)/2 for the time offset τ that decouples the fit
    let (half_cos2, half_sin2) = if hypot > 0.0 {
        (0.5 * sum2.re / hypot, 0.5 * sum2.im / hypot)
    } else {
        (0.5, 0.0)
    };
    let cos_tau = (0.5 + half_cos2).max(0.0).sqrt();
    let sin_tau = (0.5 - half_cos2).max(0.0).sqrt().copysign(half_sin2);

    let cos_norm = 0.5 * n + half_cos2 * sum2.re + half_sin2 * sum2.im;
    let sin_norm = n - cos_norm;

    let c = cos_tau * sum.re + sin_tau * sum.im;
    let s = cos_tau * sum.im - sin_tau * sum.re;

    // A quadrature term vanishes when every sample sits on the same phase
    // (e.g. at half the sampling rate of a regular cadence).
    let floor = n * f64::EPSILON.sqrt();
    let c_term = if cos_norm > floor { c * c / cos_norm } else { 0.0 };
    let s_term = if sin_norm > floor { s * s / sin_norm } else { 0.0 };
    ((c_term + s_term) / (2.0 * variance)).max(0.0)
}

/// Spread `value` over the `MACC` mesh points nearest `position` with
/// Lagrange interpolation weights. The mesh is periodic.
fn extirpolate(value: f64, mesh: &mut [f64], position: f64) {
    let len = mesh.len() as isize;
    let nearest = position.round();
    if position == nearest {
        mesh[(nearest as isize).rem_euclid(len) as usize] += value;
        return;
    }

    let low = (position - 0.5 * MACC as f64 + 1.0).floor() as isize;
    let nodes: Vec<isize> = (low..low + MACC as isize).collect();
    let product: f64 = nodes.iter().map(|&k| position - k as f64).product();

    for &k in &nodes {
        let denominator: f64 = nodes
            .iter()
            .filter(|&&other| other != k)
            .map(|&other| (k - other) as f64)
            .product();
        let weight = product / (denominator * (position - k as f64));
        mesh[k.rem_euclid(len) as usize] += value * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Irregular sampling: a regular cadence with two gaps and a slight jitter.
    fn irregular_times(n: usize, cadence: f64) -> Vec<f64> {
        (0..n)
            .filter(|i| !(200..260).contains(i) && !(500..520).contains(i))
            .map(|i| i as f64 * cadence + 0.003 * ((i * 7919) % 13) as f64 / 13.0)
            .collect()
    }

    fn sinusoid(time: &[f64], freq: f64, amplitude: f64) -> Vec<f64> {
        time.iter()
            .map(|t| amplitude * (2.0 * PI * freq * t).sin() + 3.0)
            .collect()
    }

    #[test]
    fn extirpolation_preserves_total_weight() {
        let mut mesh = vec![0.0; 32];
        extirpolate(2.0, &mut mesh, 10.3);
        assert_relative_eq!(mesh.iter().sum::<f64>(), 2.0, epsilon = 1e-12);

        let mut mesh = vec![0.0; 32];
        extirpolate(1.0, &mut mesh, 31.6);
        assert_relative_eq!(mesh.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(mesh[0] != 0.0, "weights should wrap around the periodic mesh");
    }

    #[test]
    fn extirpolation_on_grid_point_is_exact() {
        let mut mesh = vec![0.0; 8];
        extirpolate(1.5, &mut mesh, 3.0);
        assert_eq!(mesh[3], 1.5);
        assert_eq!(mesh.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn direct_finds_injected_frequency() {
        let time = irregular_times(800, 0.02);
        let values = sinusoid(&time, 3.7, 1.0);
        let n_freq = grid_size(time[time.len() - 1] - time[0], 5.0, 20.0);
        let ls = lomb_scargle_direct(&time, &values, 5.0, n_freq).unwrap();

        let (_, freq, _) = ls.peak().unwrap();
        assert!((freq - 3.7).abs() < 2.0 * ls.frequency_step());
    }

    #[test]
    fn fast_matches_direct() {
        let time = irregular_times(800, 0.02);
        let values = sinusoid(&time, 3.7, 1.0);
        let n_freq = grid_size(time[time.len() - 1] - time[0], 5.0, 20.0);

        let direct = lomb_scargle_direct(&time, &values, 5.0, n_freq).unwrap();
        let fast = lomb_scargle_fast(&time, &values, 5.0, n_freq).unwrap();

        assert_eq!(fast.frequency.len(), direct.frequency.len());
        let (peak_idx, _, peak_power) = direct.peak().unwrap();
        assert_eq!(fast.peak().unwrap().0, peak_idx);
        for (f, d) in fast.power.iter().zip(&direct.power) {
            assert!(
                (f - d).abs() < 1e-2 * peak_power,
                "fast {} vs direct {} (peak {})",
                f,
                d,
                peak_power
            );
        }
    }

    #[test]
    fn peak_power_of_clean_sinusoid_is_near_half_n() {
        // With the variance normalization a noiseless sinusoid peaks at about N/2.
        // Baseline of exactly 20 puts 2.0 cycles/unit on the grid (j = 160).
        let time: Vec<f64> = (0..401).map(|i| i as f64 * 0.05).collect();
        let values = sinusoid(&time, 2.0, 1.0);
        let n_freq = grid_size(time[400] - time[0], 4.0, 9.0);
        let ls = lomb_scargle_direct(&time, &values, 4.0, n_freq).unwrap();
        let (_, _, p) = ls.peak().unwrap();
        assert_relative_eq!(p, 200.0, max_relative = 0.02);
        assert!(ls.false_alarm_probability() < 1e-50);
    }

    #[test]
    fn constant_series_has_zero_power() {
        let time: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let values = vec![7.0; 50];
        let ls = lomb_scargle_fast(&time, &values, 5.0, 100).unwrap();
        assert!(ls.power.iter().all(|&p| p == 0.0));
        assert_eq!(ls.false_alarm_probability(), 1.0);
    }

    #[test]
    fn grid_has_expected_spacing() {
        let time = vec![0.0, 1.0, 3.0, 10.0];
        let ls = lomb_scargle_direct(&time, &[1.0, 2.0, 1.5, 0.5], 5.0, 10).unwrap();
        assert_relative_eq!(ls.frequency_step(), 1.0 / 50.0, epsilon = 1e-15);
        assert_relative_eq!(ls.frequency[0], 1.0 / 50.0, epsilon = 1e-15);
        assert_relative_eq!(ls.frequency[9], 10.0 / 50.0, epsilon = 1e-15);
    }

    #[test]
    fn grid_size_is_strictly_below_limit() {
        // df = 0.1, limit 1.0 -> 0.1..0.9
        assert_eq!(grid_size(2.0, 5.0, 1.0), 9);
        assert_eq!(grid_size(2.0, 5.0, 1.05), 10);
        assert_eq!(grid_size(0.0, 5.0, 1.0), 0);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(
            lomb_scargle_fast(&[1.0], &[1.0], 5.0, 10).unwrap_err(),
            LightCurveError::InsufficientData { needed: 2, got: 1 }
        );
        assert!(matches!(
            lomb_scargle_direct(&[0.0, 1.0], &[1.0, 2.0], 0.0, 10),
            Err(LightCurveError::InvalidParameter(_))
        ));
        assert!(matches!(
            lomb_scargle_direct(&[0.0, 1.0], &[1.0], 5.0, 10),
            Err(LightCurveError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn false_alarm_probability_limits() {
        assert_eq!(false_alarm_probability(0.0, 100.0), 1.0);
        assert!(false_alarm_probability(50.0, 100.0) < 1e-15);
        let p = false_alarm_probability(5.0, 10.0);
        assert_relative_eq!(p, 1.0 - (1.0 - (-5.0f64).exp()).powf(10.0), epsilon = 1e-12);
    }
}

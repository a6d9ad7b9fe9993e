//! FFT utilities for spectral analysis.
//!
//! Thin wrappers over `rustfft` used by the fast periodogram and the
//! spectrum autocorrelation.

use rustfft::{num_complex::Complex64, FftDirection, FftPlanner};

/// Run an unnormalized FFT in place.
///
/// `FftDirection::Inverse` evaluates `Σ x[k] · exp(+2πi·jk/N)` without the
/// `1/N` factor.
pub fn fft_in_place(buffer: &mut [Complex64], direction: FftDirection) {
    if buffer.is_empty() {
        return;
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft(buffer.len(), direction);
    fft.process(buffer);
}

/// Linear (non-circular) autocorrelation for non-negative lags.
///
/// Returns `r[k] = Σ_i x[i] · x[i + k]` for `k = 0..n`. The input is
/// zero-padded to at least `2n` before transforming so that no wrap-around
/// terms leak in.
pub fn linear_autocorrelation(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let padded = (2 * n).next_power_of_two();
    let mut buffer = vec![Complex64::new(0.0, 0.0); padded];
    for (slot, &x) in buffer.iter_mut().zip(signal) {
        slot.re = x;
    }

    fft_in_place(&mut buffer, FftDirection::Forward);
    for value in &mut buffer {
        *value = Complex64::new(value.norm_sqr(), 0.0);
    }
    fft_in_place(&mut buffer, FftDirection::Inverse);

    let scale = padded as f64;
    buffer.iter().take(n).map(|c| c.re / scale).collect()
}

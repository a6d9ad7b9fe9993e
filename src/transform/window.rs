//! Sliding-window filters over evenly indexed samples.
//!
//! Windows are measured in samples, not time. Edges are handled by mirror
//! reflection about the outer edge of the array (`d c b a | a b c d | d c b a`),
//! so a filtered series has the same length as its input and no NaN padding.

use std::cmp::Ordering;

/// Default kernel truncation for [`gaussian_filter`], in standard deviations.
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Map an index that may fall outside `0..n` back into range by reflection.
///
/// `n` must be non-zero.
pub fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let j = i.rem_euclid(period);
    if j < n {
        j as usize
    } else {
        (period - 1 - j) as usize
    }
}

/// Normalized Gaussian weights for offsets `-radius..=radius`.
///
/// The radius is `round(truncate * sigma)`. Weights sum to one.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    if sigma <= 0.0 || !sigma.is_finite() {
        return vec![1.0];
    }
    let radius = (truncate * sigma + 0.5).floor().max(0.0) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-((k * k) as f64) / denom).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Gaussian smoothing with standard deviation `sigma` (in samples).
///
/// A `sigma` of zero (or below) returns the input unchanged.
pub fn gaussian_filter(series: &[f64], sigma: f64) -> Vec<f64> {
    gaussian_filter_truncated(series, sigma, DEFAULT_TRUNCATE)
}

/// Gaussian smoothing with an explicit kernel truncation.
pub fn gaussian_filter_truncated(series: &[f64], sigma: f64, truncate: f64) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let kernel = gaussian_kernel(sigma, truncate);
    if kernel.len() == 1 {
        return series.to_vec();
    }

    let radius = (kernel.len() / 2) as isize;
    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * series[reflect_index(i + k as isize - radius, n)])
                .sum()
        })
        .collect()
}

/// Running median over a centered window of `size` samples.
///
/// For an even `size` the window covers `size / 2` samples before the centre
/// and `size / 2 - 1` after it.
pub fn median_filter(series: &[f64], size: usize) -> Vec<f64> {
    rolling_apply_reflect(series, size, |window| {
        let mut sorted = window.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let n = sorted.len();
        if n.is_multiple_of(2) {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        }
    })
}

/// Generic centered window application with reflected edges.
fn rolling_apply_reflect<F>(series: &[f64], size: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    if size <= 1 {
        return series.to_vec();
    }

    let left = (size / 2) as isize;
    let mut window = vec![0.0; size];
    (0..n as isize)
        .map(|i| {
            for (j, slot) in window.iter_mut().enumerate() {
                *slot = series[reflect_index(i - left + j as isize, n)];
            }
            f(&window)
        })
        .collect()
}

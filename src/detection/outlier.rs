//! Iterative sigma clipping.
//!
//! A sample is an outlier when its deviation from the median of the surviving
//! samples exceeds `sigma` robust standard deviations (MAD scaled to a
//! Gaussian sigma). Clipping repeats on the survivors until no new outliers
//! appear or the iteration cap is reached.

use crate::utils::stats::{median, robust_std};
use serde::{Deserialize, Serialize};

/// Robust scales below this are treated as zero spread and clip nothing.
const MIN_SCALE: f64 = 1e-10;

/// Configuration for sigma clipping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigmaClipConfig {
    /// Threshold above the center, in robust standard deviations.
    pub sigma: f64,
    /// Threshold below the center. `None` uses `sigma`.
    ///
    /// Transit searches often raise this so that genuine dips survive.
    pub sigma_lower: Option<f64>,
    /// Maximum number of clipping passes.
    pub max_iters: usize,
}

impl Default for SigmaClipConfig {
    fn default() -> Self {
        Self {
            sigma: 6.0,
            sigma_lower: None,
            max_iters: 10,
        }
    }
}

impl SigmaClipConfig {
    /// Symmetric clipping at `sigma`.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            ..Default::default()
        }
    }

    /// Clip only high outliers at `sigma`; dips of any depth survive.
    pub fn upper_only(sigma: f64) -> Self {
        Self::new(sigma).with_sigma_lower(f64::INFINITY)
    }

    /// Use a separate threshold for low outliers.
    pub fn with_sigma_lower(mut self, sigma_lower: f64) -> Self {
        self.sigma_lower = Some(sigma_lower);
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters.max(1);
        self
    }

    fn lower(&self) -> f64 {
        self.sigma_lower.unwrap_or(self.sigma)
    }
}

/// Result of sigma clipping.
#[derive(Debug, Clone)]
pub struct SigmaClipResult {
    /// `true` for every sample flagged as an outlier (non-finite values included).
    pub mask: Vec<bool>,
    /// Median of the surviving samples.
    pub center: f64,
    /// Robust standard deviation of the surviving samples.
    pub scale: f64,
    /// Number of passes that removed at least one sample.
    pub iterations: usize,
    /// False when the iteration cap stopped clipping before it was stable.
    pub converged: bool,
}

impl SigmaClipResult {
    /// Number of samples flagged.
    pub fn outlier_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Indices of flagged samples.
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| i)
            .collect()
    }

    /// Check if a specific index was flagged.
    pub fn is_outlier(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }
}

/// Flag outliers by iterative sigma clipping.
pub fn sigma_clip(series: &[f64], config: &SigmaClipConfig) -> SigmaClipResult {
    let mut mask: Vec<bool> = series.iter().map(|x| !x.is_finite()).collect();
    let mut center = f64::NAN;
    let mut scale = f64::NAN;
    let mut iterations = 0;
    let mut converged = false;

    let upper = config.sigma;
    let lower = config.lower();

    for _ in 0..config.max_iters.max(1) {
        let kept: Vec<f64> = series
            .iter()
            .zip(&mask)
            .filter(|(_, &m)| !m)
            .map(|(&x, _)| x)
            .collect();
        if kept.is_empty() {
            converged = true;
            break;
        }

        center = median(&kept);
        scale = robust_std(&kept);
        if scale < MIN_SCALE {
            converged = true;
            break;
        }

        let mut removed = 0;
        for (x, m) in series.iter().zip(mask.iter_mut()) {
            if *m {
                continue;
            }
            let deviation = (x - center) / scale;
            if deviation > upper || deviation < -lower {
                *m = true;
                removed += 1;
            }
        }

        if removed == 0 {
            converged = true;
            break;
        }
        iterations += 1;
    }

    SigmaClipResult {
        mask,
        center,
        scale,
        iterations,
        converged,
    }
}

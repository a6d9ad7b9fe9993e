//! Light-curve cleaning.
//!
//! Cleaning runs in two phases:
//!
//! 1. **Masking** drops rows: non-finite values, the first `burn_in_count`
//!    samples, samples inside exclusion windows and sigma-clipped outliers.
//!    Burn-in and exclusion windows refer to the input indexing and times;
//!    sigma clipping only sees what survives them.
//! 2. **Detrending** re-centers the flux and subtracts a heavy Gaussian
//!    smoothing, leaving variability faster than roughly two days.
//!
//! Cleaning never fails. Masking everything yields an empty light curve and
//! a warning.

use crate::core::LightCurve;
use crate::detection::outlier::{sigma_clip, SigmaClipConfig};
use crate::transform::window::gaussian_filter;
use crate::utils::stats::mean;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Gaussian detrending width in samples (~45 h at a 30-minute cadence).
pub const DEFAULT_DETREND_SIGMA: f64 = 90.0;

/// Half-open time interval `[start, start + width)` to drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExclusionWindow {
    pub start: f64,
    pub width: f64,
}

impl ExclusionWindow {
    pub fn new(start: f64, width: f64) -> Self {
        Self { start, width }
    }

    /// Window covering `[start, end)`.
    pub fn between(start: f64, end: f64) -> Self {
        Self {
            start,
            width: end - start,
        }
    }

    /// One window of `width` starting at each of `times` (e.g. the settling
    /// period after every data downlink).
    pub fn after_each(times: &[f64], width: f64) -> Vec<Self> {
        times.iter().map(|&start| Self::new(start, width)).collect()
    }

    pub fn end(&self) -> f64 {
        self.start + self.width
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }
}

/// How flux is re-centered before detrending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Recenter {
    /// Flux is a normalized ratio around 1; subtract 1.
    #[default]
    Ratio,
    /// Subtract the mean of the surviving samples.
    Mean,
    /// Leave flux as is.
    None,
}

/// Cleaning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Leading samples to drop unconditionally.
    pub burn_in_count: usize,
    /// Re-centering applied to the surviving flux.
    pub recenter: Recenter,
    /// Gaussian smoothing width (samples) subtracted from the flux.
    /// `None` disables detrending.
    pub detrend_sigma: Option<f64>,
    /// Time intervals to drop.
    pub exclusion_windows: Vec<ExclusionWindow>,
    /// Outlier rejection.
    pub sigma_clip: SigmaClipConfig,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            burn_in_count: 0,
            recenter: Recenter::Ratio,
            detrend_sigma: Some(DEFAULT_DETREND_SIGMA),
            exclusion_windows: Vec::new(),
            sigma_clip: SigmaClipConfig::default(),
        }
    }
}

impl CleanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one exclusion window.
    pub fn with_exclusion_window(mut self, window: ExclusionWindow) -> Self {
        self.exclusion_windows.push(window);
        self
    }

    /// Add several exclusion windows.
    pub fn with_exclusion_windows(mut self, windows: impl IntoIterator<Item = ExclusionWindow>) -> Self {
        self.exclusion_windows.extend(windows);
        self
    }

    /// Set the burn-in count.
    pub fn with_burn_in(mut self, burn_in_count: usize) -> Self {
        self.burn_in_count = burn_in_count;
        self
    }

    /// Set a symmetric sigma-clip threshold.
    pub fn with_sigma_clip(mut self, sigma: f64) -> Self {
        self.sigma_clip.sigma = sigma;
        self
    }

    /// Replace the sigma-clip settings.
    pub fn with_sigma_clip_config(mut self, sigma_clip: SigmaClipConfig) -> Self {
        self.sigma_clip = sigma_clip;
        self
    }

    /// Set the re-centering mode.
    pub fn with_recenter(mut self, recenter: Recenter) -> Self {
        self.recenter = recenter;
        self
    }

    /// Set the detrending width; `None` disables it.
    pub fn with_detrend(mut self, detrend_sigma: Option<f64>) -> Self {
        self.detrend_sigma = detrend_sigma;
        self
    }

    fn excluded(&self, time: f64) -> bool {
        self.exclusion_windows.iter().any(|w| w.contains(time))
    }
}

/// What cleaning removed. Each sample is attributed to the first mask that
/// dropped it, in the order listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_len: usize,
    pub non_finite: usize,
    pub burn_in: usize,
    pub excluded: usize,
    pub clipped: usize,
    pub output_len: usize,
}

impl CleaningReport {
    /// Total samples removed.
    pub fn removed(&self) -> usize {
        self.input_len - self.output_len
    }

    /// True when nothing survived.
    pub fn is_empty(&self) -> bool {
        self.output_len == 0
    }
}

/// Drop masked samples without touching the flux values.
pub fn mask(lc: &LightCurve, config: &CleanConfig) -> LightCurve {
    mask_with_report(lc, config).0
}

/// Mask, re-center and detrend.
pub fn clean(lc: &LightCurve, config: &CleanConfig) -> LightCurve {
    clean_with_report(lc, config).0
}

/// [`clean`] plus a breakdown of what was removed.
pub fn clean_with_report(lc: &LightCurve, config: &CleanConfig) -> (LightCurve, CleaningReport) {
    let (masked, report) = mask_with_report(lc, config);
    if masked.is_empty() {
        warn!(
            input = report.input_len,
            label = masked.label().unwrap_or(""),
            "cleaning removed every sample"
        );
        return (masked, report);
    }

    let mut cleaned = masked;
    detrend(cleaned.flux_mut(), config);
    (cleaned, report)
}

fn mask_with_report(lc: &LightCurve, config: &CleanConfig) -> (LightCurve, CleaningReport) {
    let n = lc.len();
    let mut report = CleaningReport {
        input_len: n,
        ..Default::default()
    };
    let mut keep = vec![true; n];

    for (i, k) in keep.iter_mut().enumerate() {
        if !(lc.time()[i].is_finite() && lc.flux()[i].is_finite() && lc.flux_err()[i].is_finite()) {
            *k = false;
            report.non_finite += 1;
        } else if i < config.burn_in_count {
            *k = false;
            report.burn_in += 1;
        } else if config.excluded(lc.time()[i]) {
            *k = false;
            report.excluded += 1;
        }
    }

    let survivors: Vec<usize> = (0..n).filter(|&i| keep[i]).collect();
    let flux: Vec<f64> = survivors.iter().map(|&i| lc.flux()[i]).collect();
    let clip = sigma_clip(&flux, &config.sigma_clip);
    for (&i, &outlier) in survivors.iter().zip(&clip.mask) {
        if outlier {
            keep[i] = false;
            report.clipped += 1;
        }
    }

    let masked = lc.select(&keep);
    report.output_len = masked.len();

    debug!(
        input = report.input_len,
        non_finite = report.non_finite,
        burn_in = report.burn_in,
        excluded = report.excluded,
        clipped = report.clipped,
        clip_iterations = clip.iterations,
        output = report.output_len,
        "masked light curve"
    );

    (masked, report)
}

/// Re-center and detrend `flux` in place.
fn detrend(flux: &mut [f64], config: &CleanConfig) {
    let offset = match config.recenter {
        Recenter::Ratio => 1.0,
        Recenter::Mean => mean(flux),
        Recenter::None => 0.0,
    };
    flux.iter_mut().for_each(|f| *f -= offset);

    if let Some(sigma) = config.detrend_sigma.filter(|&s| s > 0.0) {
        let trend = gaussian_filter(flux, sigma);
        for (f, t) in flux.iter_mut().zip(&trend) {
            *f -= t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wiggly(n: usize) -> LightCurve {
        let time: Vec<f64> = (0..n).map(|i| i as f64 / 48.0).collect();
        let flux: Vec<f64> = (0..n)
            .map(|i| 1.0 + 1e-3 * (i as f64 * 0.37).sin())
            .collect();
        LightCurve::with_constant_error(time, flux, 1e-4).unwrap()
    }

    // ==================== exclusion windows ====================

    #[test]
    fn window_is_half_open() {
        let w = ExclusionWindow::new(2.0, 1.0);
        assert!(w.contains(2.0));
        assert!(w.contains(2.999));
        assert!(!w.contains(3.0));
        assert!(!w.contains(1.999));
        assert_eq!(ExclusionWindow::between(2.0, 3.0), w);
    }

    #[test]
    fn after_each_builds_one_window_per_time() {
        let windows = ExclusionWindow::after_each(&[10.0, 20.0], 0.5);
        assert_eq!(windows, vec![ExclusionWindow::new(10.0, 0.5), ExclusionWindow::new(20.0, 0.5)]);
    }

    // ==================== masking ====================

    #[test]
    fn exclusion_and_burn_in_are_removed() {
        let lc = wiggly(200);
        let config = CleanConfig::new()
            .with_burn_in(10)
            .with_exclusion_window(ExclusionWindow::new(1.0, 0.5));
        let (cleaned, report) = clean_with_report(&lc, &config);

        // [1.0, 1.5) at 48 samples/day covers samples 48..72
        assert_eq!(report.burn_in, 10);
        assert_eq!(report.excluded, 24);
        assert_eq!(report.clipped, 0);
        assert_eq!(cleaned.len(), 200 - 34);
        assert_eq!(report.removed(), 34);
        assert!(cleaned.time().iter().all(|&t| !(1.0..1.5).contains(&t)));
        assert_relative_eq!(cleaned.time()[0], 10.0 / 48.0);
    }

    #[test]
    fn burn_in_overlapping_a_window_counts_once() {
        let lc = wiggly(100);
        let config = CleanConfig::new()
            .with_burn_in(5)
            .with_exclusion_window(ExclusionWindow::new(0.0, 10.0 / 48.0));
        let (_, report) = clean_with_report(&lc, &config);
        assert_eq!(report.burn_in, 5);
        assert_eq!(report.excluded, 5);
        assert_eq!(report.output_len, 90);
    }

    #[test]
    fn outliers_are_clipped() {
        let mut flux = wiggly(300).flux().to_vec();
        flux[100] = 1.5;
        flux[200] = 0.2;
        let lc = wiggly(300).with_flux(flux).unwrap();

        let (cleaned, report) = clean_with_report(&lc, &CleanConfig::default());
        assert_eq!(report.clipped, 2);
        assert_eq!(cleaned.len(), 298);
    }

    #[test]
    fn non_finite_rows_are_dropped_first() {
        let mut flux = wiggly(50).flux().to_vec();
        flux[3] = f64::NAN;
        let lc = wiggly(50).with_flux(flux).unwrap();

        let (cleaned, report) = clean_with_report(&lc, &CleanConfig::new().with_burn_in(5));
        assert_eq!(report.non_finite, 1);
        assert_eq!(report.burn_in, 4);
        assert!(cleaned.is_finite());
    }

    #[test]
    fn masking_is_idempotent() {
        let mut flux = wiggly(400).flux().to_vec();
        for i in (0..400).step_by(53) {
            flux[i] += 0.05;
        }
        let lc = wiggly(400).with_flux(flux).unwrap();
        let config = CleanConfig::new()
            .with_exclusion_windows(ExclusionWindow::after_each(&[2.0, 5.0], 0.25))
            .with_sigma_clip(4.0);

        let once = mask(&lc, &config);
        let twice = mask(&once, &config);
        assert!(once.len() < lc.len());
        assert_eq!(once, twice);
    }

    #[test]
    fn arrays_stay_aligned() {
        let lc = wiggly(500).with_label("TIC 7");
        let config = CleanConfig::new()
            .with_burn_in(30)
            .with_exclusion_window(ExclusionWindow::new(3.0, 1.0));
        let cleaned = clean(&lc, &config);
        assert_eq!(cleaned.time().len(), cleaned.flux().len());
        assert_eq!(cleaned.time().len(), cleaned.flux_err().len());
        assert_eq!(cleaned.label(), Some("TIC 7"));
    }

    // ==================== empty results ====================

    #[test]
    fn everything_masked_gives_empty_curve() {
        let lc = wiggly(20);
        let config = CleanConfig::new().with_exclusion_window(ExclusionWindow::new(-1.0, 100.0));
        let (cleaned, report) = clean_with_report(&lc, &config);
        assert!(cleaned.is_empty());
        assert!(report.is_empty());
        assert_eq!(report.excluded, 20);

        let cleaned = clean(&LightCurve::empty(), &CleanConfig::default());
        assert!(cleaned.is_empty());
    }

    // ==================== detrending ====================

    #[test]
    fn ratio_recentering_without_detrend_subtracts_one() {
        let lc = wiggly(100);
        let config = CleanConfig::new().with_detrend(None);
        let cleaned = clean(&lc, &config);
        for (raw, c) in lc.flux().iter().zip(cleaned.flux()) {
            assert_relative_eq!(*c, raw - 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn mean_recentering_gives_zero_mean() {
        let lc = wiggly(100);
        let config = CleanConfig::new()
            .with_detrend(None)
            .with_recenter(Recenter::Mean);
        let cleaned = clean(&lc, &config);
        assert_relative_eq!(mean(cleaned.flux()), 0.0, epsilon = 1e-12);

        let untouched = clean(&lc, &config.clone().with_recenter(Recenter::None));
        assert_eq!(untouched.flux(), lc.flux());
    }

    #[test]
    fn detrending_removes_slow_drift_and_keeps_fast_signal() {
        // Slow drift plus a 2-hour oscillation
        let n = 960;
        let time: Vec<f64> = (0..n).map(|i| i as f64 / 48.0).collect();
        let fast: Vec<f64> = time
            .iter()
            .map(|t| 1e-3 * (2.0 * std::f64::consts::PI * t * 12.0).sin())
            .collect();
        let flux: Vec<f64> = time
            .iter()
            .zip(&fast)
            .map(|(t, f)| 1.0 + 0.01 * (t / 20.0).sin() + f)
            .collect();
        let lc = LightCurve::with_constant_error(time, flux, 1e-4).unwrap();

        let cleaned = clean(&lc, &CleanConfig::default());
        // Away from the edges the residual is the fast oscillation.
        for i in 300..660 {
            assert!((cleaned.flux()[i] - fast[i]).abs() < 2e-4);
        }
    }

    #[test]
    fn detrending_only_rewrites_flux() {
        let lc = wiggly(300)
            .with_label("TIC 9")
            .with_breakpoints(crate::core::Breakpoints::new(vec![3.0]));
        let config = CleanConfig::new().with_burn_in(12);
        let masked = mask(&lc, &config);
        let cleaned = clean(&lc, &config);

        assert_eq!(cleaned.time(), masked.time());
        assert_eq!(cleaned.flux_err(), masked.flux_err());
        assert_eq!(cleaned.label(), Some("TIC 9"));
        assert_eq!(cleaned.breakpoints(), masked.breakpoints());
        assert!(cleaned.flux().iter().zip(masked.flux()).all(|(c, m)| c != m));
        assert!(mean(cleaned.flux()).abs() < 1e-4);
    }

    #[test]
    fn config_serde_defaults() {
        let config: CleanConfig = serde_json::from_str(r#"{"burn_in_count": 30}"#).unwrap();
        assert_eq!(config.burn_in_count, 30);
        assert_eq!(config.sigma_clip.sigma, 6.0);
        assert_eq!(config.detrend_sigma, Some(DEFAULT_DETREND_SIGMA));
        assert_eq!(config.recenter, Recenter::Ratio);
    }
}

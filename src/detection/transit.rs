//! Box least squares (BLS) transit search.
//!
//! A transit is modelled as a two-level step: the star sits at one level out
//! of transit and drops by `depth` for a fraction of each period. For each
//! trial period the series is folded and every box (start phase, width) is
//! fitted; the detection statistic is the log-likelihood improvement of the
//! box model over a constant,
//!
//! ```text
//! power = ½ · depth² / (1/W_in + 1/W_out)
//! ```
//!
//! where `W_in`/`W_out` are the summed inverse-variance weights inside and
//! outside the box.
//!
//! The scan runs in two passes:
//!
//! 1. A coarse pass over a frequency grid, folding into `phase_bins` bins and
//!    evaluating boxes of whole bins. This yields the [`BlsPeriodogram`].
//! 2. A refinement around the coarse winner on a finer period grid where box
//!    edges fall between individual samples, so the reported epoch and depth
//!    are not limited by the bin width.
//!
//! Only the single best candidate is kept. Ranking several candidates would
//! need the scan to keep local maxima, which it does not.

use crate::core::LightCurve;
use crate::error::{LightCurveError, Result};
use crate::priors::StellarPriors;
use crate::utils::stats::{median, std_dev};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sub-steps across the two coarse grid cells around the winner.
const REFINE_STEPS: usize = 40;

/// Transit search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Shortest trial period, days.
    pub min_period: f64,
    /// Longest trial period, days.
    pub max_period: f64,
    /// Longest transit duration considered, as a fraction of the period.
    /// Also sets the density of the period grid.
    pub duration_frac: f64,
    /// Phase bins per trial period in the coarse pass.
    pub phase_bins: usize,
    /// Multiplier on the frequency step; below 1 samples the grid more densely.
    pub frequency_factor: f64,
    /// Weight samples by `1 / flux_err²` when every error is usable.
    pub use_flux_err: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_period: 1.0,
            max_period: 21.0,
            duration_frac: 0.16,
            phase_bins: 200,
            frequency_factor: 1.0,
            use_flux_err: true,
        }
    }
}

impl SearchConfig {
    /// Search `[min_period, max_period]` with the default duration fraction.
    pub fn new(min_period: f64, max_period: f64) -> Self {
        Self {
            min_period,
            max_period,
            ..Default::default()
        }
    }

    /// Set the maximum duration fraction.
    pub fn with_duration_frac(mut self, duration_frac: f64) -> Self {
        self.duration_frac = duration_frac;
        self
    }

    /// Set the number of coarse phase bins.
    pub fn with_phase_bins(mut self, phase_bins: usize) -> Self {
        self.phase_bins = phase_bins;
        self
    }

    /// Set the frequency-step multiplier.
    pub fn with_frequency_factor(mut self, frequency_factor: f64) -> Self {
        self.frequency_factor = frequency_factor;
        self
    }

    /// Choose between `flux_err` weights and uniform weights.
    pub fn with_flux_err(mut self, use_flux_err: bool) -> Self {
        self.use_flux_err = use_flux_err;
        self
    }

    /// Derive the duration fraction from the central-transit duration of a
    /// Jupiter-sized planet at `min_period` around the given star.
    pub fn informed_by(mut self, priors: &StellarPriors) -> Self {
        let fraction = priors.duration_fraction(self.min_period);
        if fraction.is_finite() && fraction > 0.0 {
            self.duration_frac = fraction.clamp(0.01, 0.5);
        }
        self
    }

    /// Check the period bounds and grid settings.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.min_period, self.max_period);
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0) {
            return Err(LightCurveError::InvalidSearchRange(format!(
                "periods must be positive and finite (min {}, max {})",
                lo, hi
            )));
        }
        if hi <= lo {
            return Err(LightCurveError::InvalidSearchRange(format!(
                "max_period ({}) must exceed min_period ({})",
                hi, lo
            )));
        }
        if !(self.duration_frac > 0.0 && self.duration_frac < 1.0) {
            return Err(LightCurveError::InvalidSearchRange(format!(
                "duration_frac must lie in (0, 1), got {}",
                self.duration_frac
            )));
        }
        if self.phase_bins < 2 {
            return Err(LightCurveError::InvalidParameter(format!(
                "phase_bins must be at least 2, got {}",
                self.phase_bins
            )));
        }
        if !(self.frequency_factor.is_finite() && self.frequency_factor > 0.0) {
            return Err(LightCurveError::InvalidParameter(format!(
                "frequency_factor must be positive, got {}",
                self.frequency_factor
            )));
        }
        Ok(())
    }
}

/// Best transit found by a period scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitCandidate {
    /// Period, days.
    pub period: f64,
    /// Mid-transit time, in `[t_first, t_first + period)`.
    pub t0: f64,
    /// Fractional depth (out-of-transit mean minus in-transit mean).
    pub depth: f64,
    /// Depth divided by its uncertainty.
    pub depth_snr: f64,
    /// Box duration, days.
    pub duration: f64,
    /// Detection statistic.
    pub power: f64,
}

impl TransitCandidate {
    /// Periods to check for aliasing: `k·P` and `P/k` for `k = 2..=max_order`.
    pub fn harmonic_periods(&self, max_order: usize) -> Vec<f64> {
        (2..=max_order)
            .flat_map(|k| [self.period * k as f64, self.period / k as f64])
            .collect()
    }

    /// Time of the `n`-th transit after `t0`.
    pub fn transit_time(&self, n: i64) -> f64 {
        self.t0 + n as f64 * self.period
    }
}

/// Coarse-pass result for every trial period, in ascending period order.
///
/// Periods where no box had a positive depth carry zero power and depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlsPeriodogram {
    pub period: Vec<f64>,
    pub power: Vec<f64>,
    pub t0: Vec<f64>,
    pub depth: Vec<f64>,
    pub depth_snr: Vec<f64>,
    pub duration: Vec<f64>,
}

impl BlsPeriodogram {
    pub fn len(&self) -> usize {
        self.period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    /// Index of the highest power. The first (shortest) period wins ties.
    /// `None` when no period produced a positive-depth box.
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &p) in self.power.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            match best {
                Some(b) if self.power[b] >= p => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Candidate at grid index `i`.
    pub fn candidate(&self, i: usize) -> Option<TransitCandidate> {
        (i < self.len()).then(|| TransitCandidate {
            period: self.period[i],
            t0: self.t0[i],
            depth: self.depth[i],
            depth_snr: self.depth_snr[i],
            duration: self.duration[i],
            power: self.power[i],
        })
    }

    /// Best coarse candidate.
    pub fn best(&self) -> Option<TransitCandidate> {
        self.best_index().and_then(|i| self.candidate(i))
    }

    /// Power at the grid period closest to `period`.
    pub fn power_near(&self, period: f64) -> Option<f64> {
        let i = self
            .period
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - period).abs().total_cmp(&(b.1 - period).abs()))
            .map(|(i, _)| i)?;
        Some(self.power[i])
    }
}

/// Search `[min_period, max_period]` for the best box-shaped transit.
pub fn search(
    lc: &LightCurve,
    min_period: f64,
    max_period: f64,
    duration_frac: f64,
) -> Result<TransitCandidate> {
    let config = SearchConfig::new(min_period, max_period).with_duration_frac(duration_frac);
    search_with(lc, &config)
}

/// Search with full control over the grid and weighting.
pub fn search_with(lc: &LightCurve, config: &SearchConfig) -> Result<TransitCandidate> {
    let samples = Samples::prepare(lc, config)?;
    let periodogram = scan(&samples, config);
    let index = periodogram.best_index().ok_or(LightCurveError::NoDetection)?;
    let coarse = periodogram
        .candidate(index)
        .ok_or(LightCurveError::NoDetection)?;

    let step = period_step(coarse.period, config, samples.baseline);
    let candidate = refine(&samples, &coarse, step, config).unwrap_or(coarse);

    debug!(
        trial_periods = periodogram.len(),
        period = candidate.period,
        depth = candidate.depth,
        depth_snr = candidate.depth_snr,
        "transit search finished"
    );
    Ok(candidate)
}

/// Run the coarse pass and return power for every trial period.
pub fn search_periodogram(lc: &LightCurve, config: &SearchConfig) -> Result<BlsPeriodogram> {
    let samples = Samples::prepare(lc, config)?;
    Ok(scan(&samples, config))
}

/// Trial periods in ascending order, uniform in frequency.
pub fn period_grid(config: &SearchConfig, baseline: f64) -> Vec<f64> {
    let df = frequency_step(config, baseline);
    let f_hi = 1.0 / config.min_period;
    let f_lo = 1.0 / config.max_period;
    if !(df.is_finite() && df > 0.0) {
        return vec![config.min_period];
    }
    let count = ((f_hi - f_lo) / df).floor() as usize + 1;
    (0..count).map(|j| 1.0 / (f_hi - j as f64 * df)).collect()
}

fn frequency_step(config: &SearchConfig, baseline: f64) -> f64 {
    config.frequency_factor * config.duration_frac * config.min_period / (baseline * baseline)
}

/// Spacing of the period grid near `period`.
fn period_step(period: f64, config: &SearchConfig, baseline: f64) -> f64 {
    period * period * frequency_step(config, baseline)
}

/// Finite samples with their weights.
struct Samples {
    time: Vec<f64>,
    flux: Vec<f64>,
    weight: Vec<f64>,
    t_ref: f64,
    baseline: f64,
    cadence: f64,
    total_weight: f64,
    total_weighted_flux: f64,
}

impl Samples {
    fn prepare(lc: &LightCurve, config: &SearchConfig) -> Result<Self> {
        config.validate()?;

        let rows: Vec<(f64, f64, f64)> = lc
            .time()
            .iter()
            .zip(lc.flux())
            .zip(lc.flux_err())
            .filter(|((t, f), _)| t.is_finite() && f.is_finite())
            .map(|((&t, &f), &e)| (t, f, e))
            .collect();
        if rows.len() < 3 {
            return Err(LightCurveError::InvalidSearchRange(format!(
                "need at least 3 samples to constrain a transit, got {}",
                rows.len()
            )));
        }

        let time: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let flux: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let errors_usable = rows.iter().all(|r| r.2.is_finite() && r.2 > 0.0);
        let weight: Vec<f64> = if config.use_flux_err && errors_usable {
            rows.iter().map(|r| 1.0 / (r.2 * r.2)).collect()
        } else {
            let sigma = std_dev(&flux);
            let w = if sigma.is_finite() && sigma > 0.0 {
                1.0 / (sigma * sigma)
            } else {
                1.0
            };
            vec![w; flux.len()]
        };

        let t_ref = time[0];
        let baseline = time[time.len() - 1] - t_ref;
        let gaps: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).collect();
        let cadence = median(&gaps);
        let total_weight = weight.iter().sum();
        let total_weighted_flux = weight.iter().zip(&flux).map(|(w, y)| w * y).sum();

        Ok(Self {
            time,
            flux,
            weight,
            t_ref,
            baseline,
            cadence,
            total_weight,
            total_weighted_flux,
        })
    }

    fn len(&self) -> usize {
        self.time.len()
    }

    fn phase(&self, i: usize, period: f64) -> f64 {
        ((self.time[i] - self.t_ref) / period).rem_euclid(1.0)
    }
}

/// Least-squares box fit from in-box sums.
#[derive(Debug, Clone, Copy)]
struct BoxFit {
    power: f64,
    depth: f64,
    depth_snr: f64,
}

fn fit_box(w_in: f64, wy_in: f64, samples: &Samples) -> Option<BoxFit> {
    let w_out = samples.total_weight - w_in;
    if w_in <= 0.0 || w_out <= samples.total_weight * 1e-12 {
        return None;
    }
    let depth = (samples.total_weighted_flux - wy_in) / w_out - wy_in / w_in;
    if depth.is_nan() || depth <= 0.0 {
        return None;
    }
    let variance = 1.0 / w_in + 1.0 / w_out;
    Some(BoxFit {
        power: 0.5 * depth * depth / variance,
        depth,
        depth_snr: depth / variance.sqrt(),
    })
}

fn scan(samples: &Samples, config: &SearchConfig) -> BlsPeriodogram {
    let periods = period_grid(config, samples.baseline);
    let results: Vec<Option<TransitCandidate>> = periods
        .par_iter()
        .map(|&period| scan_period(samples, period, config))
        .collect();

    let mut periodogram = BlsPeriodogram::default();
    for (&period, result) in periods.iter().zip(results) {
        let c = result.unwrap_or(TransitCandidate {
            period,
            t0: samples.t_ref,
            depth: 0.0,
            depth_snr: 0.0,
            duration: 0.0,
            power: 0.0,
        });
        periodogram.period.push(c.period);
        periodogram.power.push(c.power);
        periodogram.t0.push(c.t0);
        periodogram.depth.push(c.depth);
        periodogram.depth_snr.push(c.depth_snr);
        periodogram.duration.push(c.duration);
    }
    periodogram
}

/// Best whole-bin box at one trial period.
fn scan_period(samples: &Samples, period: f64, config: &SearchConfig) -> Option<TransitCandidate> {
    let nb = config.phase_bins;
    let max_width = ((config.duration_frac * nb as f64).ceil() as usize).clamp(1, nb - 1);

    let mut bin_w = vec![0.0; nb];
    let mut bin_wy = vec![0.0; nb];
    for i in 0..samples.len() {
        let b = ((samples.phase(i, period) * nb as f64) as usize).min(nb - 1);
        bin_w[b] += samples.weight[i];
        bin_wy[b] += samples.weight[i] * samples.flux[i];
    }

    // Prefix sums over two laps so boxes can wrap past phase 1.
    let mut cum_w = vec![0.0; 2 * nb + 1];
    let mut cum_wy = vec![0.0; 2 * nb + 1];
    for k in 0..2 * nb {
        cum_w[k + 1] = cum_w[k] + bin_w[k % nb];
        cum_wy[k + 1] = cum_wy[k] + bin_wy[k % nb];
    }

    let mut best: Option<(BoxFit, usize, usize)> = None;
    for start in 0..nb {
        for width in 1..=max_width {
            let end = start + width;
            let w_in = cum_w[end] - cum_w[start];
            let wy_in = cum_wy[end] - cum_wy[start];
            if let Some(fit) = fit_box(w_in, wy_in, samples) {
                if best.is_none_or(|(b, _, _)| fit.power > b.power) {
                    best = Some((fit, start, width));
                }
            }
        }
    }

    best.map(|(fit, start, width)| {
        let center = ((start as f64 + 0.5 * width as f64) / nb as f64).rem_euclid(1.0);
        TransitCandidate {
            period,
            t0: samples.t_ref + center * period,
            depth: fit.depth,
            depth_snr: fit.depth_snr,
            duration: period * width as f64 / nb as f64,
            power: fit.power,
        }
    })
}

/// Fine scan around the coarse winner with box edges between individual
/// samples. Box edges are limited to a phase window spanning the coarse box
/// plus one box width and two phase bins on either side.
fn refine(
    samples: &Samples,
    coarse: &TransitCandidate,
    step: f64,
    config: &SearchConfig,
) -> Option<TransitCandidate> {
    let period = coarse.period;
    let lo = (period - step).max(config.min_period);
    let hi = (period + step).min(config.max_period);
    let trials: Vec<f64> = if hi > lo {
        (0..=REFINE_STEPS)
            .map(|k| lo + (hi - lo) * k as f64 / REFINE_STEPS as f64)
            .collect()
    } else {
        vec![period]
    };

    let half_window = (coarse.duration / period + 2.0 / config.phase_bins as f64).min(0.5);
    let results: Vec<Option<TransitCandidate>> = trials
        .par_iter()
        .map(|&p| scan_window(samples, p, coarse.t0, half_window, config.duration_frac))
        .collect();

    let mut best: Option<TransitCandidate> = None;
    for candidate in results.into_iter().flatten() {
        if best.is_none_or(|b| candidate.power > b.power) {
            best = Some(candidate);
        }
    }
    best
}

/// Best box at one period among runs of phase-sorted samples lying within
/// `half_window` of the phase of `epoch` and spanning at most `max_span`.
fn scan_window(
    samples: &Samples,
    period: f64,
    epoch: f64,
    half_window: f64,
    max_span: f64,
) -> Option<TransitCandidate> {
    let center = ((epoch - samples.t_ref) / period).rem_euclid(1.0);
    let mut window: Vec<(f64, usize)> = (0..samples.len())
        .filter_map(|i| {
            let offset = (samples.phase(i, period) - center + 0.5).rem_euclid(1.0) - 0.5;
            (offset.abs() <= half_window).then_some((offset, i))
        })
        .collect();
    window.sort_by(|a, b| a.0.total_cmp(&b.0));

    let m = window.len();
    let mut cum_w = vec![0.0; m + 1];
    let mut cum_wy = vec![0.0; m + 1];
    for (k, &(_, i)) in window.iter().enumerate() {
        cum_w[k + 1] = cum_w[k] + samples.weight[i];
        cum_wy[k + 1] = cum_wy[k] + samples.weight[i] * samples.flux[i];
    }

    let mut best: Option<(BoxFit, usize, usize)> = None;
    for start in 0..m {
        let first = window[start].0;
        for end in start + 1..=m {
            if window[end - 1].0 - first > max_span {
                break;
            }
            let w_in = cum_w[end] - cum_w[start];
            let wy_in = cum_wy[end] - cum_wy[start];
            if let Some(fit) = fit_box(w_in, wy_in, samples) {
                if best.is_none_or(|(b, _, _)| fit.power > b.power) {
                    best = Some((fit, start, end));
                }
            }
        }
    }

    best.map(|(fit, start, end)| {
        let first = window[start].0;
        let last = window[end - 1].0;
        let mid = (center + 0.5 * (first + last)).rem_euclid(1.0);
        TransitCandidate {
            period,
            t0: samples.t_ref + mid * period,
            depth: fit.depth,
            depth_snr: fit.depth_snr,
            duration: (last - first) * period + samples.cadence,
            power: fit.power,
        }
    })
}

//! End-to-end tests of the full pipeline on synthetic light curves.
//!
//! The series mimic a 27-day observing sector at 30-minute cadence with a
//! box-shaped transit injected at a known period.

use lightcurve_search::core::{Breakpoints, LightCurve};
use lightcurve_search::detection::{analyze, autocorrelate, search, SearchConfig};
use lightcurve_search::export::{write_candidate, write_light_curve, write_spectrum};
use lightcurve_search::pipeline::{Pipeline, PipelineConfig, PipelineContext};
use lightcurve_search::priors::StellarPriors;
use lightcurve_search::transform::{clean, fold, CleanConfig, ExclusionWindow};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;

/// 27 days at 48 samples per day.
const SAMPLES: usize = 1296;

fn in_transit(t: f64, period: f64, t0: f64, duration: f64) -> bool {
    let phase = ((t - t0) / period + 0.5).rem_euclid(1.0) - 0.5;
    (phase * period).abs() < 0.5 * duration
}

/// Normalized flux with a box transit, optionally with Gaussian noise.
fn sector(period: f64, t0: f64, depth: f64, duration: f64, sigma: f64, seed: u64) -> LightCurve {
    let mut rng = StdRng::seed_from_u64(seed);
    let time: Vec<f64> = (0..SAMPLES).map(|i| 1325.0 + i as f64 / 48.0).collect();
    let flux: Vec<f64> = time
        .iter()
        .map(|&t| {
            let noise = if sigma > 0.0 {
                let u1: f64 = 1.0 - rng.gen::<f64>();
                let u2: f64 = rng.gen();
                sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
            } else {
                0.0
            };
            let dip = if in_transit(t, period, t0, duration) {
                depth
            } else {
                0.0
            };
            1.0 - dip + noise
        })
        .collect();
    LightCurve::with_constant_error(time, flux, sigma.max(1e-4)).unwrap()
}

// ==================== end to end ====================

#[test]
fn recovers_injected_transit_with_defaults() {
    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0, 1);
    let output = Pipeline::default()
        .run(&lc, &PipelineContext::for_target("synthetic"))
        .unwrap();

    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    assert_eq!(output.cleaned.len(), lc.len());

    let candidate = output.candidate.expect("transit should be found");
    assert!(
        (candidate.period - 5.0).abs() < 0.01,
        "period {}",
        candidate.period
    );
    assert!(
        (candidate.depth - 0.005).abs() < 0.1 * 0.005,
        "depth {}",
        candidate.depth
    );
    assert!(candidate.depth_snr > 0.0);

    // The reported epoch lines up with one of the injected transits.
    let offset = ((candidate.t0 - 1327.0) / candidate.period + 0.5).rem_euclid(1.0) - 0.5;
    assert!((offset * candidate.period).abs() < 0.05);

    let folded = output.folded.unwrap();
    assert_eq!(folded.len(), output.cleaned.len());
    assert!(folded.phase().windows(2).all(|w| w[0] <= w[1]));
    let binned = output.binned.unwrap();
    assert_eq!(binned.len(), folded.len().div_ceil(7));
}

#[test]
fn recovers_transit_under_photometric_noise_with_defaults() {
    let (period, t0, depth, duration) = (5.0, 1327.0, 0.005, 0.125);
    let lc = sector(period, t0, depth, duration, 3e-4, 21);
    let in_transit_count = |curve: &LightCurve| {
        curve
            .time()
            .iter()
            .filter(|&&t| in_transit(t, period, t0, duration))
            .count()
    };

    let output = Pipeline::default().run(&lc, &PipelineContext::new()).unwrap();
    assert_eq!(in_transit_count(&output.cleaned), in_transit_count(&lc));
    assert!(output.report.clipped < 3, "clipped {}", output.report.clipped);

    let candidate = output.candidate.unwrap();
    assert!(
        (candidate.period - period).abs() < 0.01,
        "period {}",
        candidate.period
    );
    assert!(
        (candidate.depth - depth).abs() < 0.1 * depth,
        "depth {}",
        candidate.depth
    );
}

#[test]
fn symmetric_clipping_removes_transit_samples() {
    let (period, t0, depth, duration) = (5.0, 1327.0, 0.005, 0.125);
    let lc = sector(period, t0, depth, duration, 3e-4, 21);
    let n_in_transit = lc
        .time()
        .iter()
        .filter(|&&t| in_transit(t, period, t0, duration))
        .count();

    let config = PipelineConfig::default().with_keep_dips(false);
    let output = Pipeline::new(config).run(&lc, &PipelineContext::new()).unwrap();
    assert!(output.report.clipped >= n_in_transit);
    assert!(output
        .cleaned
        .time()
        .iter()
        .all(|&t| !in_transit(t, period, t0, duration)));
}

#[test]
fn noisy_transit_is_recovered() {
    let lc = sector(3.7, 1326.1, 0.004, 0.15, 0.0008, 11);
    let config = PipelineConfig::default().with_search(SearchConfig::new(1.0, 10.0));
    let output = Pipeline::new(config)
        .run(&lc, &PipelineContext::new())
        .unwrap();

    let candidate = output.candidate.unwrap();
    assert!(
        (candidate.period - 3.7).abs() < 0.02,
        "period {}",
        candidate.period
    );
    assert!(
        (candidate.depth - 0.004).abs() < 0.3 * 0.004,
        "depth {}",
        candidate.depth
    );
}

#[test]
fn spectrum_conserves_variance_after_cleaning() {
    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0005, 3);
    let output = Pipeline::default().run(&lc, &PipelineContext::new()).unwrap();

    let spectrum = output.spectrum.unwrap();
    let scaled: Vec<f64> = output.cleaned.flux().iter().map(|f| f * 1e6).collect();
    let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
    let variance = scaled.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / scaled.len() as f64;

    let ratio = spectrum.integrated_power() / (2.0 * variance);
    assert!((ratio - 1.0).abs() < 1e-9, "ratio {}", ratio);
    assert!(spectrum.max_frequency() < PipelineConfig::default().spectrum.max_frequency());

    let acf = output.autocorrelation.unwrap();
    assert_eq!(acf.len(), spectrum.len());
    let n = acf.len();
    for i in 0..n {
        assert_eq!(acf.acf()[i], acf.acf()[n - 1 - i]);
    }
}

#[test]
fn staged_calls_match_the_pipeline() {
    let lc = sector(4.2, 1328.0, 0.006, 0.14, 0.0, 5);
    let config = PipelineConfig::default()
        .with_search(SearchConfig::new(2.0, 8.0))
        .with_parallel(false);
    let output = Pipeline::new(config.clone())
        .run(&lc, &PipelineContext::new())
        .unwrap();

    let cleaned = clean(&lc, &config.cleaning());
    assert_eq!(cleaned, output.cleaned);

    let spectrum = analyze(&cleaned, &config.spectrum).unwrap();
    assert_eq!(Some(&spectrum), output.spectrum.as_ref());
    assert_eq!(Some(autocorrelate(&spectrum)), output.autocorrelation);

    let candidate = search(&cleaned, 2.0, 8.0, config.search.duration_frac).unwrap();
    assert_eq!(Some(candidate), output.candidate);
    let folded = fold(&cleaned, candidate.period, candidate.t0).unwrap();
    assert_eq!(Some(folded), output.folded);
}

// ==================== configuration ====================

#[test]
fn exclusion_windows_from_toml_are_applied() {
    let text = r#"
        [clean]
        burn_in_count = 48
        exclusion_windows = [{ start = 1338.5, width = 1.0 }]

        [search]
        min_period = 2.0
        max_period = 8.0
    "#;
    let config = PipelineConfig::from_toml_str(text).unwrap();
    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0, 1);
    let output = Pipeline::new(config).run(&lc, &PipelineContext::new()).unwrap();

    assert_eq!(output.report.burn_in, 48);
    assert_eq!(output.report.excluded, 48);
    assert_eq!(output.cleaned.len(), lc.len() - 96);
    assert!(output
        .cleaned
        .time()
        .iter()
        .all(|&t| t >= 1326.0 && !(1338.5..1339.5).contains(&t)));

    let candidate = output.candidate.unwrap();
    assert!((candidate.period - 5.0).abs() < 0.01);
}

#[test]
fn priors_and_breakpoints_flow_through_context() {
    let mut catalog = HashMap::new();
    catalog.insert("subgiant-1".to_string(), StellarPriors::new(2.0, 1.2, 5200.0));
    let ctx = PipelineContext::for_target("subgiant-1")
        .with_catalog(&catalog)
        .with_breakpoints(Breakpoints::new(vec![1338.6]));

    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0, 1);
    let config = PipelineConfig::default().with_search(SearchConfig::new(2.0, 8.0));
    let output = Pipeline::new(config).run(&lc, &ctx).unwrap();

    assert_eq!(output.target_id.as_deref(), Some("subgiant-1"));
    assert_eq!(output.cleaned.label(), Some("subgiant-1"));
    assert_eq!(output.cleaned.breakpoints().len(), 1);
    assert!(output.candidate.is_some());
}

#[test]
fn post_downlink_windows_remove_each_gap_edge() {
    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0, 1);
    let windows = ExclusionWindow::after_each(&[1330.0, 1340.0], 0.5);
    let config = CleanConfig::new().with_exclusion_windows(windows);
    let cleaned = clean(&lc, &config);
    assert_eq!(cleaned.len(), lc.len() - 48);
}

// ==================== export ====================

#[test]
fn artifacts_export_as_two_column_text() {
    let lc = sector(5.0, 1327.0, 0.005, 0.125, 0.0, 1);
    let config = PipelineConfig::default().with_search(SearchConfig::new(2.0, 8.0));
    let output = Pipeline::new(config).run(&lc, &PipelineContext::new()).unwrap();

    let mut cleaned = Vec::new();
    write_light_curve(&mut cleaned, &output.cleaned).unwrap();
    let cleaned = String::from_utf8(cleaned).unwrap();
    assert_eq!(cleaned.lines().count(), output.cleaned.len());
    assert!(cleaned
        .lines()
        .all(|line| line.split(' ').count() == 2 && line.split(' ').all(|v| v.parse::<f64>().is_ok())));

    let spectrum = output.spectrum.unwrap();
    let mut text = Vec::new();
    write_spectrum(&mut text, &spectrum).unwrap();
    assert_eq!(String::from_utf8(text).unwrap().lines().count(), spectrum.len());

    let mut text = Vec::new();
    write_candidate(&mut text, &output.candidate.unwrap()).unwrap();
    assert_eq!(String::from_utf8(text).unwrap().lines().count(), 2);
}

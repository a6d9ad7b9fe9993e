//! Quickstart example demonstrating basic usage of lightcurve-search.
//!
//! Run with: cargo run --example quickstart

use lightcurve_search::core::LightCurve;
use lightcurve_search::export::write_candidate;
use lightcurve_search::pipeline::{Pipeline, PipelineConfig, PipelineContext};
use lightcurve_search::priors::StellarPriors;
use lightcurve_search::transform::ExclusionWindow;
use std::collections::HashMap;

fn main() {
    println!("=== lightcurve-search Quickstart ===\n");

    // 1. Build a 27-day light curve at 30-minute cadence
    let period = 4.3;
    let t0 = 1327.2;
    let time: Vec<f64> = (0..1296).map(|i| 1325.0 + i as f64 / 48.0).collect();
    let flux: Vec<f64> = time
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let phase = ((t - t0) / period + 0.5).rem_euclid(1.0) - 0.5;
            let dip = if (phase * period).abs() < 0.07 { 0.004 } else { 0.0 };
            let ripple = 3e-4 * ((i * 7919 % 101) as f64 / 101.0 - 0.5); // pseudo-noise
            let drift = 2e-3 * ((t - 1325.0) / 9.0).sin(); // slow instrumental trend
            1.0 - dip + ripple + drift
        })
        .collect();
    let lc = LightCurve::with_constant_error(time, flux, 3e-4).unwrap();
    println!("Created light curve with {} samples over {:.1} days", lc.len(), lc.baseline());

    // 2. Configure: skip the first hours and a mid-sector downlink gap
    let mut config = PipelineConfig::default();
    config.clean = config
        .clean
        .with_burn_in(24)
        .with_exclusion_window(ExclusionWindow::new(1338.5, 1.0));
    println!("\n--- Configuration (TOML) ---");
    println!("{}", config.to_toml_string().unwrap());

    // 3. Optional stellar priors from a catalog
    let mut catalog = HashMap::new();
    catalog.insert("demo-star".to_string(), StellarPriors::new(1.1, 1.0, 5800.0));
    let ctx = PipelineContext::for_target("demo-star").with_catalog(&catalog);

    // 4. Run every stage
    let output = Pipeline::new(config).run(&lc, &ctx).unwrap();
    println!("--- Cleaning ---");
    println!("{:?}", output.report);

    if let Some(spectrum) = &output.spectrum {
        let (freq, power) = spectrum.peak();
        println!("\n--- Power spectrum ---");
        println!("{} frequencies, bin width {:.4} µHz", spectrum.len(), spectrum.bin_width());
        println!("peak at {:.2} µHz (power {:.3e})", freq, power);
    }

    match &output.candidate {
        Some(candidate) => {
            println!("\n--- Transit candidate ---");
            println!("period    {:.4} d (injected {})", candidate.period, period);
            println!("t0        {:.4}", candidate.t0);
            println!("depth     {:.5} (injected 0.004)", candidate.depth);
            println!("depth SNR {:.1}", candidate.depth_snr);
            println!("aliases   {:?}", candidate.harmonic_periods(3));
            write_candidate(std::io::stdout(), candidate).unwrap();
        }
        None => println!("\nNo transit found"),
    }

    if let Some(binned) = &output.binned {
        println!("\n--- Binned fold ({} rows) ---", binned.len());
        let (lowest, flux) = binned
            .iter()
            .fold((0.0, f64::INFINITY), |acc, (p, f)| if f < acc.1 { (p, f) } else { acc });
        println!("minimum flux {:.5} at phase {:.4}", flux, lowest);
    }

    for warning in &output.warnings {
        println!("warning: {}", warning);
    }

    println!("\n=== Quickstart complete ===");
}

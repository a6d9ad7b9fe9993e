//! End-to-end batch pipeline.
//!
//! Cleans a light curve once, then runs the two independent branches on the
//! cleaned series:
//!
//! ```text
//!            ┌─> spectrum ──> autocorrelation
//! clean ─────┤
//!            └─> transit search ──> fold
//! ```
//!
//! The branches share nothing mutable and run on the rayon pool when
//! [`PipelineConfig::parallel`] is set. All state lives in the explicit
//! [`PipelineContext`] input and [`PipelineOutput`] result.

use crate::core::{Breakpoints, FoldedLightCurve, LightCurve};
use crate::detection::autocorrelation::{autocorrelate, AutocorrelationResult};
use crate::detection::spectrum::{analyze, PowerSpectrum, SpectrumConfig};
use crate::detection::transit::{search_with, SearchConfig, TransitCandidate};
use crate::error::{LightCurveError, Result};
use crate::priors::{PriorCatalog, StellarPriors};
use crate::transform::clean::{clean_with_report, CleanConfig, CleaningReport};
use crate::transform::fold::{bin_by_count, fold};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rows per group when binning the folded curve.
pub const DEFAULT_FOLD_BIN_SIZE: usize = 7;

/// Settings for every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rows per group in the binned folded curve.
    pub fold_bin_size: usize,
    /// Let stellar priors adjust the transit duration fraction.
    pub prior_informed: bool,
    /// Run the spectral and transit branches concurrently.
    pub parallel: bool,
    /// Never sigma-clip low outliers, so transit dips survive cleaning.
    /// High outliers are still clipped at `clean.sigma_clip.sigma`.
    pub keep_dips: bool,
    pub clean: CleanConfig,
    pub spectrum: SpectrumConfig,
    pub search: SearchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fold_bin_size: DEFAULT_FOLD_BIN_SIZE,
            prior_informed: true,
            parallel: true,
            keep_dips: true,
            clean: CleanConfig::default(),
            spectrum: SpectrumConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document. Missing sections and fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LightCurveError::Config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| LightCurveError::Config(e.to_string()))
    }

    pub fn with_clean(mut self, clean: CleanConfig) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_spectrum(mut self, spectrum: SpectrumConfig) -> Self {
        self.spectrum = spectrum;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_keep_dips(mut self, keep_dips: bool) -> Self {
        self.keep_dips = keep_dips;
        self
    }

    /// Cleaning settings as the pipeline applies them.
    pub fn cleaning(&self) -> CleanConfig {
        let mut clean = self.clean.clone();
        if self.keep_dips {
            clean.sigma_clip.sigma_lower = Some(f64::INFINITY);
        }
        clean
    }

    /// Check the settings that would otherwise only fail mid-run.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.fold_bin_size == 0 {
            return Err(LightCurveError::Config("fold_bin_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Per-target inputs besides the light curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    pub target_id: Option<String>,
    pub priors: Option<StellarPriors>,
    pub breakpoints: Breakpoints,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_target(target_id: impl Into<String>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            ..Default::default()
        }
    }

    pub fn with_priors(mut self, priors: StellarPriors) -> Self {
        self.priors = Some(priors);
        self
    }

    /// Look the target up in `catalog`. A missing entry leaves priors unset.
    pub fn with_catalog(mut self, catalog: &impl PriorCatalog) -> Self {
        if let Some(id) = &self.target_id {
            self.priors = catalog.lookup(id);
        }
        self
    }

    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub target_id: Option<String>,
    pub cleaned: LightCurve,
    pub report: CleaningReport,
    pub spectrum: Option<PowerSpectrum>,
    pub autocorrelation: Option<AutocorrelationResult>,
    /// Strongest ACF spacing near the expected large separation, µHz.
    /// Only set when priors are available.
    pub mode_spacing: Option<f64>,
    pub candidate: Option<TransitCandidate>,
    pub folded: Option<FoldedLightCurve>,
    pub binned: Option<FoldedLightCurve>,
    /// Non-fatal conditions, such as an empty cleaned series.
    pub warnings: Vec<String>,
}

impl PipelineOutput {
    fn skipped(target_id: Option<String>, cleaned: LightCurve, report: CleaningReport) -> Self {
        Self {
            target_id,
            cleaned,
            report,
            spectrum: None,
            autocorrelation: None,
            mode_spacing: None,
            candidate: None,
            folded: None,
            binned: None,
            warnings: Vec::new(),
        }
    }
}

struct SpectralResult {
    spectrum: PowerSpectrum,
    autocorrelation: AutocorrelationResult,
    mode_spacing: Option<f64>,
}

struct TransitResult {
    candidate: TransitCandidate,
    folded: FoldedLightCurve,
    binned: FoldedLightCurve,
}

/// A configured pipeline. Cheap to clone and safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on `lc`.
    ///
    /// An empty cleaned series is not an error: downstream stages are skipped
    /// and a warning is recorded. A period scan without any transit-like box
    /// leaves `candidate` unset, also with a warning.
    pub fn run(&self, lc: &LightCurve, ctx: &PipelineContext) -> Result<PipelineOutput> {
        self.config.validate()?;
        let started = Instant::now();

        let mut input = lc.clone();
        if let Some(id) = &ctx.target_id {
            input = input.with_label(id.clone());
        }
        if !ctx.breakpoints.is_empty() {
            input = input.with_breakpoints(ctx.breakpoints.clone());
        }

        let (cleaned, report) = clean_with_report(&input, &self.config.cleaning());
        let mut output = PipelineOutput::skipped(ctx.target_id.clone(), cleaned, report);

        if report.is_empty() {
            output
                .warnings
                .push(format!("all {} samples were masked during cleaning", report.input_len));
            return Ok(output);
        }

        let search_config = match (&ctx.priors, self.config.prior_informed) {
            (Some(priors), true) => self.config.search.clone().informed_by(priors),
            _ => self.config.search.clone(),
        };

        let cleaned = &output.cleaned;
        let spectral = || spectral_branch(cleaned, &self.config.spectrum, ctx.priors.as_ref());
        let transit = || transit_branch(cleaned, &search_config, self.config.fold_bin_size);
        let (spectral, transit) = if self.config.parallel {
            rayon::join(spectral, transit)
        } else {
            (spectral(), transit())
        };

        let spectral = spectral?;
        output.spectrum = Some(spectral.spectrum);
        output.autocorrelation = Some(spectral.autocorrelation);
        output.mode_spacing = spectral.mode_spacing;

        match transit? {
            Some(found) => {
                output.candidate = Some(found.candidate);
                output.folded = Some(found.folded);
                output.binned = Some(found.binned);
            }
            None => {
                warn!(target_id = ?ctx.target_id, "no transit-like signal found");
                output
                    .warnings
                    .push("transit search found no positive-depth box".to_string());
            }
        }

        info!(
            target_id = ?ctx.target_id,
            samples = output.cleaned.len(),
            period = output.candidate.map(|c| c.period),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(output)
    }
}

fn spectral_branch(
    cleaned: &LightCurve,
    config: &SpectrumConfig,
    priors: Option<&StellarPriors>,
) -> Result<SpectralResult> {
    let started = Instant::now();
    let spectrum = analyze(cleaned, config)?;
    let autocorrelation = autocorrelate(&spectrum);
    let mode_spacing = priors.and_then(|p| {
        let expected = p.expected_delta_nu();
        autocorrelation
            .spacing_peak(0.5 * expected, 1.5 * expected)
            .map(|(offset, _)| offset)
    });
    debug!(
        frequencies = spectrum.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "spectral branch finished"
    );
    Ok(SpectralResult {
        spectrum,
        autocorrelation,
        mode_spacing,
    })
}

fn transit_branch(
    cleaned: &LightCurve,
    config: &SearchConfig,
    bin_size: usize,
) -> Result<Option<TransitResult>> {
    let started = Instant::now();
    let candidate = match search_with(cleaned, config) {
        Ok(candidate) => candidate,
        Err(LightCurveError::NoDetection) => return Ok(None),
        Err(e) => return Err(e),
    };
    let folded = fold(cleaned, candidate.period, candidate.t0)?;
    let binned = bin_by_count(&folded, bin_size)?;
    debug!(
        period = candidate.period,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "transit branch finished"
    );
    Ok(Some(TransitResult {
        candidate,
        folded,
        binned,
    }))
}

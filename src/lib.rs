//! # lightcurve-search
//!
//! Light curve analysis for space photometry: cleaning, power spectra in
//! µHz, spectrum autocorrelation, box-least-squares transit search and
//! phase folding.
//!
//! The stages are plain functions over [`core::LightCurve`] and can be used
//! on their own, or chained by [`pipeline::Pipeline`], which runs the
//! spectral and transit branches concurrently on the cleaned series.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod detection;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod priors;
pub mod transform;
pub mod utils;

pub use error::{LightCurveError, Result};

pub mod prelude {
    pub use crate::core::{Breakpoints, FoldedLightCurve, LightCurve};
    pub use crate::detection::{
        analyze, autocorrelate, power_spectrum, search, search_with, AutocorrelationResult,
        PowerSpectrum, SearchConfig, SpectrumConfig, TransitCandidate,
    };
    pub use crate::error::{LightCurveError, Result};
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineOutput};
    pub use crate::priors::{PriorCatalog, StellarPriors};
    pub use crate::transform::{bin, clean, fold, CleanConfig, ExclusionWindow};
}

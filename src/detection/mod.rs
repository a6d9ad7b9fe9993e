//! Signal detection on cleaned light curves.
//!
//! - [`spectrum`]: Lomb-Scargle power spectrum in µHz with power-conserving
//!   normalization
//! - [`autocorrelation`]: autocorrelation of a spectrum, for regular
//!   frequency spacings
//! - [`transit`]: box least squares period search
//! - [`outlier`]: iterative sigma clipping used by the cleaner

pub mod autocorrelation;
pub mod fft;
pub mod lomb_scargle;
pub mod outlier;
pub mod spectrum;
pub mod transit;

pub use autocorrelation::{autocorrelate, AutocorrelationResult};
pub use lomb_scargle::{lomb_scargle, LombScargle, PeriodogramMethod};
pub use outlier::{sigma_clip, SigmaClipConfig, SigmaClipResult};
pub use spectrum::{analyze, power_spectrum, PowerSpectrum, SpectrumConfig, UHZ_PER_CYCLE_PER_DAY};
pub use transit::{
    period_grid, search, search_periodogram, search_with, BlsPeriodogram, SearchConfig,
    TransitCandidate,
};

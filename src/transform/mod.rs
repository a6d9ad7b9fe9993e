//! Transformations of light curves.
//!
//! Cleaning (masking and detrending), phase folding, and the window filters
//! both are built on.
//!
//! # Example
//!
//! ```
//! use lightcurve_search::core::LightCurve;
//! use lightcurve_search::transform::{clean, fold, CleanConfig, ExclusionWindow};
//!
//! let time: Vec<f64> = (0..200).map(|i| i as f64 / 48.0).collect();
//! let flux = vec![1.0; 200];
//! let lc = LightCurve::with_constant_error(time, flux, 1e-4).unwrap();
//!
//! let config = CleanConfig::new()
//!     .with_burn_in(30)
//!     .with_exclusion_window(ExclusionWindow::new(1.0, 0.5));
//! let cleaned = clean(&lc, &config);
//! assert_eq!(cleaned.len(), 200 - 30 - 24);
//!
//! let folded = fold(&cleaned, 1.0, 0.0).unwrap();
//! assert_eq!(folded.len(), cleaned.len());
//! ```

pub mod clean;
pub mod fold;
pub mod window;

pub use clean::{
    clean, clean_with_report, mask, CleanConfig, CleaningReport, ExclusionWindow, Recenter,
    DEFAULT_DETREND_SIGMA,
};
pub use fold::{bin, bin_by_count, fold, phase_of, running_median};
pub use window::{gaussian_filter, gaussian_kernel, median_filter, reflect_index};

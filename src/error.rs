//! Error types for the lightcurve-search library.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, LightCurveError>;

/// Errors that can occur while analysing a light curve.
///
/// Cleaning and folding never fail because too many samples were removed;
/// they hand back empty values instead. Spectral analysis and the transit
/// search fail loudly, since a degenerate spectrum or candidate would be
/// misleading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LightCurveError {
    /// Too few samples (or frequencies) for the requested transform.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Malformed period bounds or a series too short to constrain a transit.
    #[error("invalid search range: {0}")]
    InvalidSearchRange(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Parallel arrays of different lengths.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Time stamps that are not strictly increasing.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// The period scan found no box with a positive depth.
    #[error("no transit-like signal found in the period scan")]
    NoDetection,

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

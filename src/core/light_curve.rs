//! LightCurve data structure for photometric time series.

use crate::error::{LightCurveError, Result};
use crate::utils::stats::median;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered time values marking boundaries between independently calibrated
/// observing segments. Annotation only; nothing in the pipeline depends on
/// them for correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints(Vec<f64>);

impl Breakpoints {
    /// Create breakpoints, sorting the supplied times.
    pub fn new(mut times: Vec<f64>) -> Self {
        times.retain(|t| t.is_finite());
        times.sort_by(f64::total_cmp);
        Self(times)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the segment containing `time` (0 before the first breakpoint).
    pub fn segment_of(&self, time: f64) -> usize {
        self.0.partition_point(|&b| b <= time)
    }
}

/// A photometric light curve: time (days), flux and flux uncertainty.
///
/// Time is strictly increasing and all three arrays have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCurve {
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Vec<f64>,
    label: Option<String>,
    breakpoints: Breakpoints,
}

impl LightCurve {
    /// Create a light curve, validating lengths and time ordering.
    pub fn new(time: Vec<f64>, flux: Vec<f64>, flux_err: Vec<f64>) -> Result<Self> {
        if flux.len() != time.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: time.len(),
                got: flux.len(),
            });
        }
        if flux_err.len() != time.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: time.len(),
                got: flux_err.len(),
            });
        }
        for i in 1..time.len() {
            if time[i].partial_cmp(&time[i - 1]) != Some(Ordering::Greater) {
                return Err(LightCurveError::TimestampError(format!(
                    "time must be strictly increasing (index {}: {} after {})",
                    i,
                    time[i],
                    time[i - 1]
                )));
            }
        }

        Ok(Self {
            time,
            flux,
            flux_err,
            label: None,
            breakpoints: Breakpoints::default(),
        })
    }

    /// Create a light curve with a constant flux uncertainty.
    pub fn with_constant_error(time: Vec<f64>, flux: Vec<f64>, flux_err: f64) -> Result<Self> {
        let errors = vec![flux_err; time.len()];
        Self::new(time, flux, errors)
    }

    /// Build a light curve from rows in arbitrary order.
    ///
    /// Rows with a non-finite time are dropped, the rest are sorted by time and
    /// rows repeating an earlier time stamp are discarded.
    pub fn from_unsorted(time: &[f64], flux: &[f64], flux_err: &[f64]) -> Result<Self> {
        if flux.len() != time.len() || flux_err.len() != time.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: time.len(),
                got: flux.len().min(flux_err.len()),
            });
        }

        let mut rows: Vec<(f64, f64, f64)> = time
            .iter()
            .zip(flux)
            .zip(flux_err)
            .filter(|((t, _), _)| t.is_finite())
            .map(|((&t, &f), &e)| (t, f, e))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        rows.dedup_by(|later, earlier| later.0 == earlier.0);

        let mut t = Vec::with_capacity(rows.len());
        let mut f = Vec::with_capacity(rows.len());
        let mut e = Vec::with_capacity(rows.len());
        for (ti, fi, ei) in rows {
            t.push(ti);
            f.push(fi);
            e.push(ei);
        }
        Self::new(t, f, e)
    }

    /// An empty light curve.
    pub fn empty() -> Self {
        Self {
            time: Vec::new(),
            flux: Vec::new(),
            flux_err: Vec::new(),
            label: None,
            breakpoints: Breakpoints::default(),
        }
    }

    /// Attach a target label (e.g. a catalog identifier).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach segment breakpoints.
    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_err(&self) -> &[f64] {
        &self.flux_err
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time span covered by the series, `last - first` (0 for < 2 samples).
    pub fn baseline(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Median spacing between consecutive samples.
    pub fn median_cadence(&self) -> Option<f64> {
        if self.time.len() < 2 {
            return None;
        }
        let gaps: Vec<f64> = self.time.windows(2).map(|w| w[1] - w[0]).collect();
        Some(median(&gaps))
    }

    /// True when every value in all three arrays is finite.
    pub fn is_finite(&self) -> bool {
        self.time
            .iter()
            .chain(&self.flux)
            .chain(&self.flux_err)
            .all(|v| v.is_finite())
    }

    /// Keep the samples where `keep` is true. Metadata is carried over.
    ///
    /// # Panics
    ///
    /// Panics if `keep` and the light curve have different lengths.
    pub fn select(&self, keep: &[bool]) -> Self {
        assert_eq!(
            keep.len(),
            self.len(),
            "selection mask length must match the light curve"
        );
        let pick = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, &k)| k)
                .map(|(&v, _)| v)
                .collect()
        };

        Self {
            time: pick(&self.time),
            flux: pick(&self.flux),
            flux_err: pick(&self.flux_err),
            label: self.label.clone(),
            breakpoints: self.breakpoints.clone(),
        }
    }

    /// Mutable access to the flux column. The slice keeps the columns aligned.
    pub fn flux_mut(&mut self) -> &mut [f64] {
        &mut self.flux
    }

    /// Return a copy with the flux replaced. Lengths must match.
    pub fn with_flux(&self, flux: Vec<f64>) -> Result<Self> {
        if flux.len() != self.len() {
            return Err(LightCurveError::DimensionMismatch {
                expected: self.len(),
                got: flux.len(),
            });
        }
        Ok(Self {
            flux,
            ..self.clone()
        })
    }
}

//! Plain-text tables for downstream plotting and archiving.
//!
//! One row per sample, space-delimited, fixed eight decimals. Columns carry
//! no header except in [`write_candidate`], which starts with a `#` line.

use crate::core::{FoldedLightCurve, LightCurve};
use crate::detection::autocorrelation::AutocorrelationResult;
use crate::detection::spectrum::PowerSpectrum;
use crate::detection::transit::TransitCandidate;
use std::io::{self, Write};

/// Write two equal-length columns.
pub fn write_columns<W: Write>(mut out: W, first: &[f64], second: &[f64]) -> io::Result<()> {
    if first.len() != second.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("column lengths differ: {} vs {}", first.len(), second.len()),
        ));
    }
    for (a, b) in first.iter().zip(second) {
        writeln!(out, "{:.8} {:.8}", a, b)?;
    }
    out.flush()
}

/// `time flux` rows.
pub fn write_light_curve<W: Write>(out: W, lc: &LightCurve) -> io::Result<()> {
    write_columns(out, lc.time(), lc.flux())
}

/// `frequency power` rows.
pub fn write_spectrum<W: Write>(out: W, spectrum: &PowerSpectrum) -> io::Result<()> {
    write_columns(out, spectrum.freq(), spectrum.power())
}

/// `lag acf` rows.
pub fn write_autocorrelation<W: Write>(out: W, acf: &AutocorrelationResult) -> io::Result<()> {
    write_columns(out, acf.lag_freq(), acf.acf())
}

/// `phase flux` rows.
pub fn write_folded<W: Write>(out: W, folded: &FoldedLightCurve) -> io::Result<()> {
    write_columns(out, folded.phase(), folded.flux())
}

/// A header line followed by one row of candidate parameters.
pub fn write_candidate<W: Write>(mut out: W, candidate: &TransitCandidate) -> io::Result<()> {
    writeln!(out, "# period t0 depth depth_snr duration power")?;
    writeln!(
        out,
        "{:.8} {:.8} {:.8} {:.8} {:.8} {:.8}",
        candidate.period,
        candidate.t0,
        candidate.depth,
        candidate.depth_snr,
        candidate.duration,
        candidate.power
    )?;
    out.flush()
}

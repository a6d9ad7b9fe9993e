//! Optional stellar parameters used to inform search defaults.
//!
//! A catalog collaborator supplies radius, mass and effective temperature by
//! target identifier. A missing entry is never an error; it only means the
//! generic defaults are used.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Radius assumed when a catalog row has none (solar radii, typical giant).
pub const FALLBACK_RADIUS_RSUN: f64 = 10.0;
/// Mass assumed when a catalog row has none or it is NaN (solar masses).
pub const FALLBACK_MASS_MSUN: f64 = 1.2;

/// Solar effective temperature used by the asteroseismic scaling relations.
pub const TEFF_SUN_K: f64 = 5777.0;
/// Solar frequency of maximum oscillation power, µHz.
pub const NUMAX_SUN_UHZ: f64 = 3090.0;
/// Solar large frequency separation, µHz.
pub const DELTA_NU_SUN_UHZ: f64 = 135.1;

/// Jupiter radius in solar radii.
pub const RJUP_IN_RSUN: f64 = 0.10045;
/// Astronomical unit in solar radii.
pub const AU_IN_RSUN: f64 = 215.032;
const DAYS_PER_YEAR: f64 = 365.25;
const SOLAR_DENSITY_CGS: f64 = 1.408;

/// Stellar parameters in solar units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StellarPriors {
    pub radius_rsun: f64,
    pub mass_msun: f64,
    pub teff_k: Option<f64>,
}

impl StellarPriors {
    pub fn new(radius_rsun: f64, mass_msun: f64, teff_k: f64) -> Self {
        Self {
            radius_rsun,
            mass_msun,
            teff_k: Some(teff_k),
        }
    }

    /// Build from a catalog row with possibly missing values.
    ///
    /// Missing or non-finite radius and mass fall back to
    /// [`FALLBACK_RADIUS_RSUN`] and [`FALLBACK_MASS_MSUN`].
    pub fn from_partial(radius_rsun: Option<f64>, mass_msun: Option<f64>, teff_k: Option<f64>) -> Self {
        let finite_positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        Self {
            radius_rsun: finite_positive(radius_rsun).unwrap_or(FALLBACK_RADIUS_RSUN),
            mass_msun: finite_positive(mass_msun).unwrap_or(FALLBACK_MASS_MSUN),
            teff_k: finite_positive(teff_k),
        }
    }

    /// Mean density relative to the Sun.
    pub fn relative_density(&self) -> f64 {
        self.mass_msun / self.radius_rsun.powi(3)
    }

    /// Mean density in g/cm³.
    pub fn density_cgs(&self) -> f64 {
        self.relative_density() * SOLAR_DENSITY_CGS
    }

    /// Expected frequency of maximum oscillation power, µHz.
    ///
    /// `ν_max ∝ M R⁻² (Teff / Teff☉)^-1/2`; the temperature term is dropped
    /// when no temperature is known.
    pub fn expected_numax(&self) -> f64 {
        let temperature = self
            .teff_k
            .map(|t| (t / TEFF_SUN_K).powf(-0.5))
            .unwrap_or(1.0);
        NUMAX_SUN_UHZ * self.mass_msun / self.radius_rsun.powi(2) * temperature
    }

    /// Expected large frequency separation, µHz (`Δν ∝ ρ^1/2`).
    pub fn expected_delta_nu(&self) -> f64 {
        DELTA_NU_SUN_UHZ * self.relative_density().sqrt()
    }

    /// Orbital semi-major axis for a given period, in stellar radii.
    pub fn scaled_semi_major_axis(&self, period_days: f64) -> f64 {
        let years = period_days / DAYS_PER_YEAR;
        let a_au = (self.mass_msun * years * years).cbrt();
        a_au * AU_IN_RSUN / self.radius_rsun
    }

    /// Transit duration (days) of a planet of `planet_radius_rjup` at impact
    /// parameter `impact` (stellar radii).
    ///
    /// `T = (P / π) · asin( sqrt((R★ + Rp)² − b²) / a )` with all lengths in
    /// solar radii. Returns 0 for a grazing geometry that never transits.
    pub fn transit_duration(&self, period_days: f64, planet_radius_rjup: f64, impact: f64) -> f64 {
        let a = self.scaled_semi_major_axis(period_days) * self.radius_rsun;
        let reach = self.radius_rsun + planet_radius_rjup * RJUP_IN_RSUN;
        let chord_sq = reach * reach - (impact * self.radius_rsun).powi(2);
        if chord_sq <= 0.0 || a <= 0.0 {
            return 0.0;
        }
        let x = (chord_sq.sqrt() / a).min(1.0);
        period_days / PI * x.asin()
    }

    /// Duration of a central transit of a Jupiter-sized planet as a fraction
    /// of the period.
    pub fn duration_fraction(&self, period_days: f64) -> f64 {
        if period_days <= 0.0 {
            return 0.0;
        }
        self.transit_duration(period_days, 1.0, 0.0) / period_days
    }
}

/// Lookup of stellar parameters by target identifier.
pub trait PriorCatalog {
    /// Parameters for `target_id`, or `None` when the target is not listed.
    fn lookup(&self, target_id: &str) -> Option<StellarPriors>;
}

impl PriorCatalog for HashMap<String, StellarPriors> {
    fn lookup(&self, target_id: &str) -> Option<StellarPriors> {
        self.get(target_id).copied()
    }
}

impl<C: PriorCatalog + ?Sized> PriorCatalog for &C {
    fn lookup(&self, target_id: &str) -> Option<StellarPriors> {
        (**self).lookup(target_id)
    }
}

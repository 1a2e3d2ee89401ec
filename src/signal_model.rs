//! # Analytic signal model
//!
//! The bridge between a detector's geometry and the quantities a
//! matched-filter pipeline measures: given a sky direction, polarization
//! angle, inclination and luminosity distance, predict the **complex
//! matched-filter SNR** each site would record for a quadrupole
//! (inspiral-like) source.
//!
//! The model factorizes into a purely geometric part — the antenna patterns
//! and geocentric time delay, bundled in [`DetectorResponse`] — and the
//! source part: the standard quadrupole amplitudes `(1 + cos²ι)/2` for the
//! plus and `cos ι` for the cross polarization, scaled by a per-detector
//! amplitude calibration and the inverse distance.
//!
//! Both localization engines consume this module; the test injections in
//! `tests/` are generated with the very same functions, so the convention
//! choices (polarization basis, delay sign) cancel by construction.

use nalgebra::Complex;

use crate::constants::{GpsSeconds, Mpc, Radian};
use crate::detectors::{antenna_pattern, time_delay_from_geocenter, Detector};
use crate::time::gmst_from_gps;

/// Geometric response of one site to one sky direction: antenna patterns
/// and the plane-wave time offset from the geocenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorResponse {
    /// Response to the plus polarization.
    pub fplus: f64,
    /// Response to the cross polarization.
    pub fcross: f64,
    /// Arrival-time offset relative to the geocenter, seconds.
    pub time_delay: f64,
}

/// Geometric response of a site at a GPS epoch.
///
/// Arguments
/// ---------
/// * `detector`: the site geometry.
/// * `ra`, `dec`: equatorial sky direction, radians.
/// * `psi`: polarization angle, radians.
/// * `t`: GPS epoch fixing the Earth orientation.
///
/// Return
/// ------
/// * The `(F₊, F×, Δt)` triple; deterministic, no internal state.
pub fn detector_response(
    detector: &Detector,
    ra: Radian,
    dec: Radian,
    psi: Radian,
    t: GpsSeconds,
) -> DetectorResponse {
    let gmst_rad = gmst_from_gps(t);
    let pat = antenna_pattern(detector, ra, dec, psi, gmst_rad);
    DetectorResponse {
        fplus: pat.fplus,
        fcross: pat.fcross,
        time_delay: time_delay_from_geocenter(detector, ra, dec, gmst_rad),
    }
}

/// Predicted complex matched-filter SNR of a quadrupole source.
///
/// Arguments
/// ---------
/// * `fplus`, `fcross`: antenna patterns of the site.
/// * `cos_inclination`: cosine of the orbital inclination, in [-1, 1];
///   ±1 is face-on/face-off, 0 is edge-on.
/// * `distance`: luminosity distance, Mpc.
/// * `amplitude_1mpc`: the sky-independent detector-frame amplitude
///   calibration — the modulus of the SNR the site would record for an
///   optimally oriented source at 1 Mpc.
///
/// Return
/// ------
/// * The complex SNR `ξ · (F₊ (1+u²)/2 + i F× u)` with `ξ =
///   amplitude_1mpc / distance`; its phase carries the plus/cross mixing,
///   on top of which the (marginalized) coalescence phase rotates.
pub fn predicted_snr(
    fplus: f64,
    fcross: f64,
    cos_inclination: f64,
    distance: Mpc,
    amplitude_1mpc: f64,
) -> Complex<f64> {
    let u = cos_inclination;
    let scale = amplitude_1mpc / distance;
    Complex::new(scale * fplus * 0.5 * (1.0 + u * u), scale * fcross * u)
}

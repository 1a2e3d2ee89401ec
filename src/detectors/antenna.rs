//! Antenna patterns and geometric time delays for a detector site.
//!
//! The computation is purely geometric: rotate the celestial direction into
//! the Earth-fixed frame with the GMST angle, build the polarization basis
//! in the plane of the sky, and contract it with the site's response
//! tensor.

use nalgebra::Vector3;

use crate::constants::{Radian, VLIGHT};
use crate::detectors::Detector;

/// Antenna response of one site to one sky direction and polarization angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaPattern {
    /// Response to the plus polarization.
    pub fplus: f64,
    /// Response to the cross polarization.
    pub fcross: f64,
}

/// Earth-fixed unit vector toward the source and the tangent basis
/// (east, north) at that direction.
fn source_frame(ra: Radian, dec: Radian, gmst_rad: Radian) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    // Earth-fixed hour-angle longitude of the source
    let alpha = ra - gmst_rad;
    let (sa, ca) = alpha.sin_cos();
    let (sd, cd) = dec.sin_cos();
    let n = Vector3::new(ca * cd, sa * cd, sd);
    let east = Vector3::new(-sa, ca, 0.0);
    let north = Vector3::new(-sd * ca, -sd * sa, cd);
    (n, east, north)
}

/// Antenna patterns `F₊`, `F×` of a site.
///
/// Arguments
/// ---------
/// * `detector`: the site (precomputed response tensor).
/// * `ra`, `dec`: equatorial sky direction, radians.
/// * `psi`: polarization angle, radians.
/// * `gmst_rad`: Greenwich Mean Sidereal Time at the arrival epoch, radians
///   (from [`crate::time::gmst`]).
///
/// Return
/// ------
/// * The pair `(F₊, F×)`; both lie in [-1, 1], and `F₊² + F×²` is
///   invariant under a change of `psi`.
pub fn antenna_pattern(
    detector: &Detector,
    ra: Radian,
    dec: Radian,
    psi: Radian,
    gmst_rad: Radian,
) -> AntennaPattern {
    let (_n, east, north) = source_frame(ra, dec, gmst_rad);
    let (sp, cp) = psi.sin_cos();
    let x = east * cp + north * sp;
    let y = -east * sp + north * cp;

    let d = detector.response();
    let dx = d * x;
    let dy = d * y;
    AntennaPattern {
        fplus: x.dot(&dx) - y.dot(&dy),
        fcross: 2.0 * x.dot(&dy),
    }
}

/// Arrival-time offset of a plane wave at the site relative to the
/// geocenter, in seconds.
///
/// Negative when the site faces the source (the wavefront reaches it before
/// the geocenter).
pub fn time_delay_from_geocenter(
    detector: &Detector,
    ra: Radian,
    dec: Radian,
    gmst_rad: Radian,
) -> f64 {
    let (n, _east, _north) = source_frame(ra, dec, gmst_rad);
    -detector.vertex().dot(&n) / VLIGHT
}

#[cfg(test)]
mod antenna_test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    /// Toy interferometer at the geocenter with arms along the global x/y axes.
    fn toy_detector() -> Detector {
        Detector::interferometer("T1", [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]).unwrap()
    }

    #[test]
    fn test_overhead_source_is_optimal() {
        let det = toy_detector();
        // Source at the celestial pole, directly above the arm plane.
        let p = antenna_pattern(&det, 0.0, FRAC_PI_2, 0.0, 0.0);
        assert_relative_eq!(p.fplus.abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.fcross, 0.0, epsilon = 1e-12);

        // Rotating the polarization by 45 degrees swaps plus and cross.
        let q = antenna_pattern(&det, 0.0, FRAC_PI_2, FRAC_PI_4, 0.0);
        assert_relative_eq!(q.fplus, 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.fcross.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_psi_invariant() {
        let det = Detector::interferometer(
            "T2",
            [0.0; 3],
            [0.6, 0.8, 0.0],
            [-0.8, 0.6, 0.0],
        )
        .unwrap();
        for i in 0..8 {
            let psi = i as f64 * FRAC_PI_4 / 2.0;
            let a = antenna_pattern(&det, 1.1, 0.3, psi, 2.0);
            let b = antenna_pattern(&det, 1.1, 0.3, 0.0, 2.0);
            assert_relative_eq!(
                a.fplus * a.fplus + a.fcross * a.fcross,
                b.fplus * b.fplus + b.fcross * b.fcross,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_time_delay_sign_and_magnitude() {
        // Site displaced 0.02 light-seconds along +x, source on the +x axis.
        let det =
            Detector::interferometer("T3", [0.02 * VLIGHT, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0])
                .unwrap();
        let dt = time_delay_from_geocenter(&det, 0.0, 0.0, 0.0);
        assert_relative_eq!(dt, -0.02, epsilon = 1e-12);
        // Opposite direction: the wave reaches the geocenter first.
        let dt_back = time_delay_from_geocenter(&det, std::f64::consts::PI, 0.0, 0.0);
        assert_relative_eq!(dt_back, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_in_plane_source_with_aligned_arm() {
        let det = toy_detector();
        // Source on the x axis: the x arm is along the line of sight, only
        // the y arm projects onto the sky plane.
        let p = antenna_pattern(&det, 0.0, 0.0, 0.0, 0.0);
        assert!(p.fplus.abs() <= 1.0 && p.fcross.abs() <= 1.0);
        assert!(p.fplus.abs() > 0.1);
    }
}

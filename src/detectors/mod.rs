//! # Detector sites & response geometry
//!
//! This module gathers **detector-site handling** and the geometric response
//! of a gravitational-wave instrument. It provides:
//!
//! - A [`Detector`] type storing the site identity and its geometry as a
//!   small closed tagged-variant ([`DetectorGeometry`]): the vertex position
//!   in the Earth-fixed frame and the **precomputed response tensor**
//!   `D = (x̂x̂ᵀ − ŷŷᵀ)/2` built from the arm directions.
//! - The antenna patterns `F₊`, `F×` for a sky direction, polarization
//!   angle and sidereal time ([`antenna_pattern`]).
//! - The time of flight from the geocenter to the site for a plane wave
//!   from a given sky direction ([`time_delay_from_geocenter`]).
//!
//! ## Frames & conventions
//!
//! - Site coordinates are **Earth-fixed** (ITRF-like): x through the
//!   Greenwich meridian and equator, z toward the north pole, meters.
//! - Sky directions are equatorial `(ra, dec)` in radians; the rotation
//!   between the two frames is the GMST angle from [`crate::time::gmst`].
//! - The polarization basis is built from the local east/north tangent
//!   vectors at the source direction, rotated by the polarization angle ψ.
//!   The convention is fixed and self-consistent across the crate: the same
//!   functions drive both simulation (test injections) and recovery.
//!
//! ## Design & invariants
//!
//! - [`Detector`] stores the **precomputed response tensor** to avoid
//!   rebuilding the outer products at every sky-pixel evaluation; the
//!   localization engine calls [`antenna_pattern`] millions of times per
//!   map.
//! - The set of detector classes is small and stable, so it is expressed as
//!   a closed enum rather than open-ended polymorphism. Ground-based
//!   interferometers are the only populated variant; a future class (e.g. a
//!   space-borne constellation arm) would be a new variant with its own
//!   response math.
//! - Constructors reject non-finite geometry with
//!   [`SkylocError::InvalidInput`], so downstream code never sees NaN.

pub mod antenna;

pub use antenna::{antenna_pattern, time_delay_from_geocenter, AntennaPattern};

use nalgebra::{Matrix3, Vector3};

use crate::skyloc_errors::SkylocError;

/// Geometry of a detector, as a closed set of instrument classes.
///
/// Ground-based interferometers are the only class in scope; the enum keeps
/// the door open for future classes without open-ended inheritance.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorGeometry {
    /// An L-shaped (or V-shaped) ground-based laser interferometer.
    GroundInterferometer {
        /// Vertex position in the Earth-fixed frame, meters.
        vertex: Vector3<f64>,
        /// Response tensor `D = (x̂x̂ᵀ − ŷŷᵀ)/2` from the arm unit vectors.
        response: Matrix3<f64>,
    },
}

/// A detector site: identity plus response geometry.
///
/// Immutable after construction; shared across triggers with `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    name: String,
    geometry: DetectorGeometry,
}

impl Detector {
    /// Build a ground-based interferometer from its vertex and arm directions.
    ///
    /// Arguments
    /// ---------
    /// * `name`: site identifier (e.g. `"H1"`); free-form, used in diagnostics.
    /// * `vertex_m`: vertex position in the Earth-fixed frame, meters.
    /// * `x_arm`, `y_arm`: arm directions in the Earth-fixed frame; any
    ///   nonzero length, normalized internally. The arms need not be exactly
    ///   perpendicular (real sites deviate slightly); the response tensor
    ///   formula holds regardless.
    ///
    /// Return
    /// ------
    /// * A [`Detector`] with the response tensor precomputed.
    ///
    /// Errors
    /// ------
    /// * [`SkylocError::InvalidInput`] if any component is non-finite or an
    ///   arm direction has zero length.
    pub fn interferometer(
        name: impl Into<String>,
        vertex_m: [f64; 3],
        x_arm: [f64; 3],
        y_arm: [f64; 3],
    ) -> Result<Self, SkylocError> {
        let name = name.into();
        for (label, v) in [("vertex", &vertex_m), ("x arm", &x_arm), ("y arm", &y_arm)] {
            if v.iter().any(|c| !c.is_finite()) {
                return Err(SkylocError::InvalidInput(format!(
                    "non-finite {label} component for detector {name}"
                )));
            }
        }
        let x = Vector3::from(x_arm);
        let y = Vector3::from(y_arm);
        if x.norm() == 0.0 || y.norm() == 0.0 {
            return Err(SkylocError::InvalidInput(format!(
                "zero-length arm direction for detector {name}"
            )));
        }
        let xu = x.normalize();
        let yu = y.normalize();
        let response = (xu * xu.transpose() - yu * yu.transpose()) * 0.5;
        Ok(Detector {
            name,
            geometry: DetectorGeometry::GroundInterferometer {
                vertex: Vector3::from(vertex_m),
                response,
            },
        })
    }

    /// Site identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The geometry variant of this site.
    pub fn geometry(&self) -> &DetectorGeometry {
        &self.geometry
    }

    /// Vertex position in the Earth-fixed frame, meters.
    pub fn vertex(&self) -> &Vector3<f64> {
        match &self.geometry {
            DetectorGeometry::GroundInterferometer { vertex, .. } => vertex,
        }
    }

    /// Precomputed response tensor.
    pub fn response(&self) -> &Matrix3<f64> {
        match &self.geometry {
            DetectorGeometry::GroundInterferometer { response, .. } => response,
        }
    }
}

#[cfg(test)]
mod detectors_test {
    use super::*;

    #[test]
    fn test_interferometer_rejects_bad_geometry() {
        assert!(matches!(
            Detector::interferometer("X1", [f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Err(SkylocError::InvalidInput(_))
        ));
        assert!(matches!(
            Detector::interferometer("X1", [0.0; 3], [0.0; 3], [0.0, 1.0, 0.0]),
            Err(SkylocError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_response_tensor_is_traceless_symmetric() {
        let det = Detector::interferometer(
            "X1",
            [1.0e6, -2.0e6, 3.0e6],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        )
        .unwrap();
        let d = det.response();
        assert!((d.trace()).abs() < 1e-12);
        assert!((d - d.transpose()).norm() < 1e-12);
        // Arms are unit-normalized, so the tensor norm is bounded
        assert!(d.norm() <= 1.0);
    }
}

//! # Pixelized sky-map container
//!
//! The common output type of both engines: a probability mass function over
//! the pixels of one HEALPix order, optionally paired with a per-pixel
//! conditional distance summary. Normalization is enforced at construction
//! and the fields are private, so a finalized map can be consumed (by the
//! credible-region statistics or by an external I/O layer) without
//! re-validating.
//!
//! Serialization of the concrete on-disk container is owned by the caller;
//! the `serde` derives only expose the in-memory structure.

use serde::{Deserialize, Serialize};

use crate::constants::{HpxOrder, Mpc, PixelId, DEG2_PER_STERAD, PROB_EPS};
use crate::healpix;
use crate::numerics::tree_sum;
use crate::skyloc_errors::SkylocError;

/// Per-pixel conditional luminosity-distance summary.
///
/// Pixels with negligible sky probability may carry NaN moments (no samples
/// or quadrature mass to condition on); consumers should gate on the sky
/// probability first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceLayer {
    mean: Vec<Mpc>,
    std: Vec<Mpc>,
}

impl DistanceLayer {
    pub(crate) fn new(mean: Vec<Mpc>, std: Vec<Mpc>) -> Self {
        debug_assert_eq!(mean.len(), std.len());
        DistanceLayer { mean, std }
    }

    /// Conditional mean distance per pixel, Mpc.
    pub fn mean(&self) -> &[Mpc] {
        &self.mean
    }

    /// Conditional distance standard deviation per pixel, Mpc.
    pub fn std(&self) -> &[Mpc] {
        &self.std
    }
}

/// A normalized probability sky map at a fixed HEALPix order.
///
/// Invariant: the pixel values are non-negative and sum to 1 within
/// [`PROB_EPS`]; both are established by [`SkyMap::from_masses`] and cannot
/// be broken afterwards (the map is immutable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMap {
    order: HpxOrder,
    probs: Vec<f64>,
    distance: Option<DistanceLayer>,
}

impl SkyMap {
    /// Build a normalized map from unnormalized per-pixel masses.
    ///
    /// Arguments
    /// ---------
    /// * `order`: resolution order of the map.
    /// * `masses`: one non-negative value per pixel (length `12·4^order`),
    ///   in arbitrary common units of probability-per-pixel.
    /// * `distance`: optional per-pixel distance summary, same length.
    ///
    /// Return
    /// ------
    /// * The finalized map with `Σ probs = 1`.
    ///
    /// Errors
    /// ------
    /// * [`SkylocError::OutOfRange`] if the order exceeds the supported maximum.
    /// * [`SkylocError::InvalidInput`] on length mismatch, negative or
    ///   non-finite masses.
    /// * [`SkylocError::DegenerateLikelihood`] if every mass is zero — the
    ///   caller gets an error, never a silently uniform map.
    pub fn from_masses(
        order: HpxOrder,
        mut masses: Vec<f64>,
        distance: Option<DistanceLayer>,
    ) -> Result<Self, SkylocError> {
        healpix::check_order(order)?;
        let npix = healpix::n_pixels(order) as usize;
        if masses.len() != npix {
            return Err(SkylocError::InvalidInput(format!(
                "mass vector has {} entries, order {} needs {}",
                masses.len(),
                order,
                npix
            )));
        }
        if let Some(layer) = &distance {
            if layer.mean.len() != npix {
                return Err(SkylocError::InvalidInput(format!(
                    "distance layer has {} entries, order {} needs {}",
                    layer.mean.len(),
                    order,
                    npix
                )));
            }
        }
        for (i, &m) in masses.iter().enumerate() {
            if !m.is_finite() || m < 0.0 {
                return Err(SkylocError::invalid_at(i, format!("pixel mass {m}")));
            }
        }
        let total = tree_sum(&masses);
        if total <= 0.0 {
            return Err(SkylocError::DegenerateLikelihood);
        }
        for m in &mut masses {
            *m /= total;
        }
        Ok(SkyMap {
            order,
            probs: masses,
            distance,
        })
    }

    /// Resolution order of the map.
    pub fn order(&self) -> HpxOrder {
        self.order
    }

    /// `nside = 2^order`.
    pub fn nside(&self) -> u64 {
        healpix::nside(self.order)
    }

    /// Total pixel count.
    pub fn n_pixels(&self) -> usize {
        self.probs.len()
    }

    /// Solid angle of one pixel, steradians.
    pub fn pixel_area(&self) -> f64 {
        healpix::pixel_area(self.order)
    }

    /// Solid angle of one pixel, square degrees.
    pub fn pixel_area_deg2(&self) -> f64 {
        self.pixel_area() * DEG2_PER_STERAD
    }

    /// Probability mass of one pixel.
    pub fn prob(&self, pix: PixelId) -> f64 {
        self.probs[pix as usize]
    }

    /// All pixel probabilities, in NESTED pixel order.
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Optional per-pixel distance summary.
    pub fn distance(&self) -> Option<&DistanceLayer> {
        self.distance.as_ref()
    }

    /// Confirm the normalization invariant within [`PROB_EPS`].
    ///
    /// Always true for maps built through [`SkyMap::from_masses`]; exposed
    /// so external consumers (I/O layers, tests) can assert it cheaply.
    pub fn is_normalized(&self) -> bool {
        (tree_sum(&self.probs) - 1.0).abs() <= PROB_EPS
    }
}

#[cfg(test)]
mod skymap_test {
    use super::*;

    #[test]
    fn test_from_masses_normalizes() {
        let npix = healpix::n_pixels(1) as usize;
        let masses: Vec<f64> = (0..npix).map(|i| (i + 1) as f64).collect();
        let map = SkyMap::from_masses(1, masses, None).unwrap();
        assert!(map.is_normalized());
        assert_eq!(map.n_pixels(), npix);
        // Probabilities preserve the ordering of the input masses
        assert!(map.prob(npix as u64 - 1) > map.prob(0));
    }

    #[test]
    fn test_all_zero_is_degenerate() {
        let npix = healpix::n_pixels(1) as usize;
        let err = SkyMap::from_masses(1, vec![0.0; npix], None).unwrap_err();
        assert_eq!(err, SkylocError::DegenerateLikelihood);
    }

    #[test]
    fn test_bad_masses_are_rejected() {
        let npix = healpix::n_pixels(1) as usize;
        let mut masses = vec![1.0; npix];
        masses[3] = -0.5;
        assert!(matches!(
            SkyMap::from_masses(1, masses, None),
            Err(SkylocError::InvalidInput(_))
        ));

        assert!(matches!(
            SkyMap::from_masses(1, vec![1.0; npix - 1], None),
            Err(SkylocError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_order_bound() {
        assert!(matches!(
            SkyMap::from_masses(healpix::MAX_ORDER + 1, vec![], None),
            Err(SkylocError::OutOfRange { .. })
        ));
    }
}

//! # Rapid Bayesian localization from matched-filter triggers
//!
//! This module defines the [`BayestarParams`] configuration struct and its
//! builder, which control how the localization engine marginalizes the
//! coherent network likelihood and how aggressively it refines the sky
//! pixelization, plus the [`DetectorTrigger`] input record.
//!
//! ## Purpose
//!
//! The [`BayestarParams`] object centralizes all tunable parameters used by
//! [`localize`](crate::bayestar::localize):
//!
//! - Resolution control (coarse starting order, maximum refined order,
//!   refinement threshold),
//! - Marginalization grids (polarization and inclination step counts,
//!   distance quadrature order),
//! - The distance prior and its support.
//!
//! ## Pipeline overview
//!
//! 1. **Validation** — the trigger set is checked for cardinality (≥ 2
//!    sites) and finiteness; malformed inputs fail fast with the offending
//!    index.
//!
//! 2. **Coarse evaluation** — the marginalized log-posterior is evaluated
//!    at the center of every pixel of the starting order, in parallel.
//!
//! 3. **Adaptive refinement** — pixels holding more than
//!    `refine_threshold` of the current posterior mass are subdivided into
//!    their 4 children and re-evaluated, one order per round, up to
//!    `max_order`.
//!
//! 4. **Flattening & normalization** — the multi-resolution tile set is
//!    rendered at the finest retained order and normalized into a
//!    [`SkyMap`](crate::skymap::SkyMap) whose masses sum to 1.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skyloc::bayestar::BayestarParams;
//!
//! let params = BayestarParams::builder()
//!     .base_order(4)
//!     .max_order(7)
//!     .refine_threshold(1e-3)
//!     .distance_nodes(32)
//!     .max_distance(500.0)
//!     .build()
//!     .unwrap();
//! ```

pub mod likelihood;
pub mod localize;

pub use localize::localize;

use std::sync::Arc;

use nalgebra::Complex;

use crate::constants::{GpsSeconds, HpxOrder, Mpc};
use crate::detectors::Detector;
use crate::healpix;
use crate::skyloc_errors::SkylocError;

/// Minimum number of participating detectors for a non-trivial localization.
pub const MIN_DETECTORS: usize = 2;

/// Per-detector matched-filter trigger summary.
///
/// One record per participating site. The fields are exactly what an
/// upstream search pipeline measures; nothing here depends on the sky
/// direction.
#[derive(Debug, Clone)]
pub struct DetectorTrigger {
    /// The site that produced the trigger.
    pub detector: Arc<Detector>,
    /// Arrival time at the site, GPS seconds.
    pub arrival_time: GpsSeconds,
    /// One-sigma arrival-time uncertainty, seconds.
    pub time_sigma: f64,
    /// Complex matched-filter SNR (amplitude and phase).
    pub snr: Complex<f64>,
    /// Sky-independent amplitude calibration: the modulus of the SNR this
    /// site would record for an optimally oriented source at 1 Mpc.
    pub amplitude_1mpc: f64,
}

impl DetectorTrigger {
    /// Check the trigger for finite, in-domain values.
    ///
    /// Errors
    /// ------
    /// * [`SkylocError::InvalidInput`] naming the offending trigger index.
    pub(crate) fn validate(&self, index: usize) -> Result<(), SkylocError> {
        if !self.arrival_time.is_finite() || self.arrival_time < 0.0 {
            return Err(SkylocError::invalid_at(
                index,
                format!(
                    "arrival time {} for detector {}",
                    self.arrival_time,
                    self.detector.name()
                ),
            ));
        }
        if !self.time_sigma.is_finite() || self.time_sigma <= 0.0 {
            return Err(SkylocError::invalid_at(
                index,
                format!(
                    "time uncertainty {} for detector {}",
                    self.time_sigma,
                    self.detector.name()
                ),
            ));
        }
        if !self.snr.re.is_finite() || !self.snr.im.is_finite() {
            return Err(SkylocError::invalid_at(
                index,
                format!("non-finite SNR for detector {}", self.detector.name()),
            ));
        }
        if !self.amplitude_1mpc.is_finite() || self.amplitude_1mpc <= 0.0 {
            return Err(SkylocError::invalid_at(
                index,
                format!(
                    "amplitude calibration {} for detector {}",
                    self.amplitude_1mpc,
                    self.detector.name()
                ),
            ));
        }
        Ok(())
    }
}

/// Prior on the luminosity distance, normalized on the configured support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistancePrior {
    /// Sources uniform in comoving-volume-like `r²dr` (the default for
    /// astrophysical populations in the local universe).
    #[default]
    UniformVolume,
    /// Flat in distance; useful for diagnostics and non-astrophysical
    /// injections.
    UniformDistance,
}

/// Configuration parameters controlling [`localize`](crate::bayestar::localize).
///
/// Fields
/// ------
/// **Resolution**
/// * `base_order` – HEALPix order of the initial coarse evaluation.
/// * `max_order` – finest order refinement may reach (bounds memory and
///   run time; the global cap is [`healpix::MAX_ORDER`]).
/// * `refine_threshold` – fraction of the current total posterior mass a
///   tile must hold to be subdivided.
///
/// **Marginalization**
/// * `psi_steps` – number of polarization-angle grid points on [0, π).
/// * `inclination_steps` – number of cos-inclination grid points on [-1, 1].
/// * `distance_nodes` – Gauss–Legendre order for the distance integral.
/// * `min_distance`, `max_distance` – distance-prior support, Mpc.
/// * `prior` – distance prior shape.
#[derive(Debug, Clone)]
pub struct BayestarParams {
    pub base_order: HpxOrder,
    pub max_order: HpxOrder,
    pub refine_threshold: f64,
    pub psi_steps: usize,
    pub inclination_steps: usize,
    pub distance_nodes: usize,
    pub min_distance: Mpc,
    pub max_distance: Mpc,
    pub prior: DistancePrior,
}

impl Default for BayestarParams {
    fn default() -> Self {
        BayestarParams {
            base_order: 4,
            max_order: 7,
            refine_threshold: 1e-3,
            psi_steps: 10,
            inclination_steps: 10,
            distance_nodes: 32,
            min_distance: 1.0,
            max_distance: 1000.0,
            prior: DistancePrior::UniformVolume,
        }
    }
}

impl BayestarParams {
    /// Construct a new [`BayestarParams`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`BayestarParamsBuilder`] for fluent configuration.
    pub fn builder() -> BayestarParamsBuilder {
        BayestarParamsBuilder::new()
    }
}

/// Builder for [`BayestarParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct BayestarParamsBuilder {
    params: BayestarParams,
}

impl BayestarParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: BayestarParams::default(),
        }
    }

    pub fn base_order(mut self, v: HpxOrder) -> Self {
        self.params.base_order = v;
        self
    }
    pub fn max_order(mut self, v: HpxOrder) -> Self {
        self.params.max_order = v;
        self
    }
    pub fn refine_threshold(mut self, v: f64) -> Self {
        self.params.refine_threshold = v;
        self
    }
    pub fn psi_steps(mut self, v: usize) -> Self {
        self.params.psi_steps = v;
        self
    }
    pub fn inclination_steps(mut self, v: usize) -> Self {
        self.params.inclination_steps = v;
        self
    }
    pub fn distance_nodes(mut self, v: usize) -> Self {
        self.params.distance_nodes = v;
        self
    }
    pub fn min_distance(mut self, v: Mpc) -> Self {
        self.params.min_distance = v;
        self
    }
    pub fn max_distance(mut self, v: Mpc) -> Self {
        self.params.max_distance = v;
        self
    }
    pub fn prior(mut self, v: DistancePrior) -> Self {
        self.params.prior = v;
        self
    }

    /// Finalize the builder and produce a [`BayestarParams`] instance.
    ///
    /// Validation rules
    /// ----------------
    /// * `base_order ≤ max_order ≤ MAX_ORDER` (resolution bound is reported
    ///   as [`SkylocError::OutOfRange`]).
    /// * `refine_threshold ∈ (0, 1)`.
    /// * `psi_steps ≥ 2`, `inclination_steps ≥ 2`, `distance_nodes ≥ 2`.
    /// * `0 < min_distance < max_distance`, both finite.
    pub fn build(self) -> Result<BayestarParams, SkylocError> {
        let p = &self.params;

        healpix::check_order(p.max_order)?;
        if p.base_order > p.max_order {
            return Err(SkylocError::InvalidParameter(format!(
                "base_order {} exceeds max_order {}",
                p.base_order, p.max_order
            )));
        }
        if !(p.refine_threshold > 0.0 && p.refine_threshold < 1.0) {
            return Err(SkylocError::InvalidParameter(
                "refine_threshold must lie in (0, 1)".into(),
            ));
        }
        if p.psi_steps < 2 || p.inclination_steps < 2 {
            return Err(SkylocError::InvalidParameter(
                "psi_steps and inclination_steps must be >= 2".into(),
            ));
        }
        if p.distance_nodes < 2 {
            return Err(SkylocError::InvalidParameter(
                "distance_nodes must be >= 2".into(),
            ));
        }
        let dist_ok = p.min_distance.is_finite()
            && p.max_distance.is_finite()
            && p.min_distance > 0.0
            && p.min_distance < p.max_distance;
        if !dist_ok {
            return Err(SkylocError::InvalidParameter(
                "require 0 < min_distance < max_distance, both finite".into(),
            ));
        }

        Ok(self.params)
    }
}

#[cfg(test)]
mod params_test {
    use super::*;
    use crate::healpix::MAX_ORDER;

    #[test]
    fn test_defaults_build() {
        let p = BayestarParams::builder().build().unwrap();
        assert_eq!(p.base_order, 4);
        assert_eq!(p.prior, DistancePrior::UniformVolume);
    }

    #[test]
    fn test_rejects_inverted_orders() {
        let err = BayestarParams::builder()
            .base_order(8)
            .max_order(6)
            .build()
            .unwrap_err();
        assert!(matches!(err, SkylocError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_order_beyond_global_cap() {
        let err = BayestarParams::builder()
            .max_order(MAX_ORDER + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SkylocError::OutOfRange { .. }));
    }

    #[test]
    fn test_rejects_bad_distance_support() {
        let err = BayestarParams::builder()
            .min_distance(100.0)
            .max_distance(10.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SkylocError::InvalidParameter(_)));
    }
}

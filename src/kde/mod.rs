//! # Sky maps from posterior samples (adaptive kernel density estimation)
//!
//! This module defines the [`KdeParams`] configuration struct and its
//! builder, plus the [`SkySample`] input record, for the sample-based
//! sky-map engine in [`sky_kde`].
//!
//! ## Purpose
//!
//! Full parameter estimation produces an unstructured cloud of posterior
//! draws `(ra, dec[, distance])`. To compare against — or substitute for —
//! a rapid-localization map, the cloud is converted into the same
//! pixelized representation. A **fixed global bandwidth is deliberately
//! not offered**: multimodal posteriors concentrate very differently per
//! mode, and a single bandwidth oversmooths the tight lobes while
//! undersmoothing the tails, which biases the credible areas. Instead each
//! sample carries its own bandwidth scaled by the local sample density
//! (distance to the k-th nearest neighbor, clamped).
//!
//! ## Pipeline overview
//!
//! 1. **Validation** — cardinality (`min_samples`), finiteness, weight and
//!    distance domain checks; distance presence must be all-or-none.
//!
//! 2. **Optional deterministic subsampling** — very large sample sets are
//!    thinned to `max_samples` by an evenly spaced, order-preserving index
//!    selection (first and last always kept), so results are reproducible
//!    without any random state.
//!
//! 3. **Bandwidths & resolution** — per-sample k-NN bandwidths; the map
//!    order is chosen so the pixel radius resolves the smallest positive
//!    nearest-neighbor separation, clamped to `[base_order, max_order]`.
//!
//! 4. **Evaluation & normalization** — kernels are accumulated in log
//!    space at every pixel center (in parallel) and the masses normalized;
//!    with distances present, kernel-weighted conditional moments fill the
//!    distance layer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skyloc::kde::{KdeParams, SkySample};
//!
//! let params = KdeParams::builder()
//!     .k_neighbors(10)
//!     .resolution_fraction(0.5)
//!     .max_order(7)
//!     .build()
//!     .unwrap();
//! let samples: Vec<SkySample> = (0..200)
//!     .map(|i| SkySample::new(1.0 + 0.01 * i as f64, 0.5))
//!     .collect();
//! let map = skyloc::kde::sky_kde::kde_sky_map(&samples, &params).unwrap();
//! # let _ = map;
//! ```

pub mod sky_kde;

pub use sky_kde::kde_sky_map;

use serde::{Deserialize, Serialize};

use crate::constants::{HpxOrder, Mpc, Radian};
use crate::healpix;
use crate::skyloc_errors::SkylocError;

/// One posterior draw over sky position and (optionally) distance.
///
/// Samples are exchangeable: the estimator does not depend on their order,
/// though the input order is preserved through any subsampling for
/// reproducibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkySample {
    /// Right ascension, radians.
    pub ra: Radian,
    /// Declination, radians.
    pub dec: Radian,
    /// Luminosity distance, Mpc; either present on every sample of a set
    /// or on none.
    pub distance: Option<Mpc>,
    /// Non-negative importance weight (default 1).
    pub weight: f64,
}

impl SkySample {
    /// A unit-weight sample without distance information.
    pub fn new(ra: Radian, dec: Radian) -> Self {
        SkySample {
            ra,
            dec,
            distance: None,
            weight: 1.0,
        }
    }

    /// Attach a luminosity distance, Mpc.
    pub fn with_distance(mut self, distance: Mpc) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Override the importance weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Configuration parameters controlling [`kde_sky_map`].
///
/// Fields
/// ------
/// **Cardinality / subsampling**
/// * `min_samples` – minimum sample count for a statistically meaningful
///   estimate; fewer fail with
///   [`SkylocError::InsufficientSamples`].
/// * `max_samples` – optional cap; larger sets are thinned
///   deterministically (evenly spaced, endpoints kept).
///
/// **Bandwidth rule**
/// * `k_neighbors` – neighbor rank used for the local density scale
///   (`k = min(k_neighbors, n-1)`).
/// * `bandwidth_scale` – multiplier on the k-NN distance.
/// * `min_bandwidth`, `max_bandwidth` – clamps, radians.
///
/// **Resolution**
/// * `resolution_fraction` – the pixel radius must not exceed this
///   fraction of the smallest positive nearest-neighbor separation.
/// * `base_order`, `max_order` – resolution clamp (global cap
///   [`healpix::MAX_ORDER`]).
#[derive(Debug, Clone)]
pub struct KdeParams {
    pub min_samples: usize,
    pub max_samples: Option<usize>,
    pub k_neighbors: usize,
    pub bandwidth_scale: f64,
    pub min_bandwidth: Radian,
    pub max_bandwidth: Radian,
    pub resolution_fraction: f64,
    pub base_order: HpxOrder,
    pub max_order: HpxOrder,
}

impl Default for KdeParams {
    fn default() -> Self {
        KdeParams {
            min_samples: 30,
            max_samples: None,
            k_neighbors: 10,
            bandwidth_scale: 1.0,
            min_bandwidth: 5.0e-4,
            max_bandwidth: 0.5,
            resolution_fraction: 0.5,
            base_order: 5,
            max_order: 7,
        }
    }
}

impl KdeParams {
    /// Construct a new [`KdeParams`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`KdeParamsBuilder`] for fluent configuration.
    pub fn builder() -> KdeParamsBuilder {
        KdeParamsBuilder::new()
    }
}

/// Builder for [`KdeParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct KdeParamsBuilder {
    params: KdeParams,
}

impl KdeParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: KdeParams::default(),
        }
    }

    pub fn min_samples(mut self, v: usize) -> Self {
        self.params.min_samples = v;
        self
    }
    pub fn max_samples(mut self, v: usize) -> Self {
        self.params.max_samples = Some(v);
        self
    }
    pub fn k_neighbors(mut self, v: usize) -> Self {
        self.params.k_neighbors = v;
        self
    }
    pub fn bandwidth_scale(mut self, v: f64) -> Self {
        self.params.bandwidth_scale = v;
        self
    }
    pub fn min_bandwidth(mut self, v: Radian) -> Self {
        self.params.min_bandwidth = v;
        self
    }
    pub fn max_bandwidth(mut self, v: Radian) -> Self {
        self.params.max_bandwidth = v;
        self
    }
    pub fn resolution_fraction(mut self, v: f64) -> Self {
        self.params.resolution_fraction = v;
        self
    }
    pub fn base_order(mut self, v: HpxOrder) -> Self {
        self.params.base_order = v;
        self
    }
    pub fn max_order(mut self, v: HpxOrder) -> Self {
        self.params.max_order = v;
        self
    }

    /// Finalize the builder and produce a [`KdeParams`] instance.
    ///
    /// Validation rules
    /// ----------------
    /// * `min_samples ≥ 2`, `k_neighbors ≥ 1`.
    /// * `max_samples ≥ min_samples` when set.
    /// * `bandwidth_scale > 0`, `0 < min_bandwidth ≤ max_bandwidth`.
    /// * `resolution_fraction > 0`.
    /// * `base_order ≤ max_order ≤ MAX_ORDER` (the global cap is reported
    ///   as [`SkylocError::OutOfRange`]).
    pub fn build(self) -> Result<KdeParams, SkylocError> {
        let p = &self.params;

        if p.min_samples < 2 {
            return Err(SkylocError::InvalidParameter(
                "min_samples must be >= 2".into(),
            ));
        }
        if p.k_neighbors == 0 {
            return Err(SkylocError::InvalidParameter(
                "k_neighbors must be >= 1".into(),
            ));
        }
        if let Some(cap) = p.max_samples {
            if cap < p.min_samples {
                return Err(SkylocError::InvalidParameter(format!(
                    "max_samples {} below min_samples {}",
                    cap, p.min_samples
                )));
            }
        }
        if !(p.bandwidth_scale.is_finite() && p.bandwidth_scale > 0.0) {
            return Err(SkylocError::InvalidParameter(
                "bandwidth_scale must be finite and > 0".into(),
            ));
        }
        let bw_ok = p.min_bandwidth.is_finite()
            && p.max_bandwidth.is_finite()
            && p.min_bandwidth > 0.0
            && p.min_bandwidth <= p.max_bandwidth;
        if !bw_ok {
            return Err(SkylocError::InvalidParameter(
                "require 0 < min_bandwidth <= max_bandwidth".into(),
            ));
        }
        if !(p.resolution_fraction.is_finite() && p.resolution_fraction > 0.0) {
            return Err(SkylocError::InvalidParameter(
                "resolution_fraction must be finite and > 0".into(),
            ));
        }
        healpix::check_order(p.max_order)?;
        if p.base_order > p.max_order {
            return Err(SkylocError::InvalidParameter(format!(
                "base_order {} exceeds max_order {}",
                p.base_order, p.max_order
            )));
        }

        Ok(self.params)
    }
}

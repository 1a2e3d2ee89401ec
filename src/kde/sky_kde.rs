//! Adaptive-bandwidth kernel density estimation on the sphere.
//!
//! Each sample contributes a Gaussian kernel in **angular separation**,
//! with a per-sample bandwidth scaled by the local sample density: the
//! angular distance to the k-th nearest neighbor, clamped to a configured
//! range. Kernels carry the small-angle solid-angle normalization
//! `1/(2π h²)` so samples with different bandwidths contribute consistent
//! mass, and everything is accumulated in log space.
//!
//! Pixel evaluations run in parallel over the chosen pixelization order;
//! each pixel is reduced in sample order and the final normalization uses
//! the fixed-order tree sum, keeping the output reproducible bit-for-bit.

use log::debug;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::constants::{HpxOrder, PixelId, DPI};
use crate::healpix::{self, angular_separation, unit_vector};
use crate::kde::{KdeParams, SkySample};
use crate::skyloc_errors::SkylocError;
use crate::skymap::{DistanceLayer, SkyMap};

/// Build a normalized sky map from a posterior sample set.
///
/// Arguments
/// ---------
/// * `samples`: the posterior draws; distances must be present on every
///   sample or on none.
/// * `params`: bandwidth, resolution and cardinality configuration.
///
/// Return
/// ------
/// * A normalized [`SkyMap`]; when the samples carry distances the map
///   includes the per-pixel kernel-weighted distance summary.
///
/// Errors
/// ------
/// * [`SkylocError::InsufficientSamples`] below `params.min_samples`.
/// * [`SkylocError::InvalidInput`] for non-finite coordinates, negative
///   weights, zero total weight, or mixed distance presence (the offending
///   sample index is named).
/// * [`SkylocError::OutOfRange`] if the configured orders exceed the
///   supported maximum.
/// * [`SkylocError::DegenerateLikelihood`] if every kernel underflows at
///   every pixel center (pathological bandwidth configuration).
pub fn kde_sky_map(samples: &[SkySample], params: &KdeParams) -> Result<SkyMap, SkylocError> {
    let has_distance = validate_samples(samples, params)?;

    let thinned = match params.max_samples {
        Some(cap) if samples.len() > cap => stride_subsample(samples, cap),
        _ => samples.to_vec(),
    };
    let n = thinned.len();

    let vectors: Vec<Vector3<f64>> = thinned.iter().map(|s| unit_vector(s.ra, s.dec)).collect();

    // Per-sample nearest-neighbor separations: (nearest, k-th nearest)
    let k = params.k_neighbors.min(n - 1);
    let nn: Vec<(f64, f64)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut seps: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| angular_separation(&vectors[i], &vectors[j]))
                .collect();
            let nearest = seps.iter().copied().fold(f64::INFINITY, f64::min);
            let (_, kth, _) = seps.select_nth_unstable_by(k - 1, f64::total_cmp);
            (nearest, *kth)
        })
        .collect();

    // Feature size: smallest strictly positive nearest-neighbor separation
    // (duplicate samples are ignored by the estimate).
    let feature_sep = nn
        .iter()
        .map(|&(d1, _)| d1)
        .filter(|&d| d > 0.0)
        .fold(f64::INFINITY, f64::min);
    let feature_sep = if feature_sep.is_finite() {
        feature_sep
    } else {
        params.min_bandwidth
    };

    let mut order: HpxOrder = params.base_order;
    while order < params.max_order
        && healpix::pixel_radius(order) > params.resolution_fraction * feature_sep
    {
        order += 1;
    }

    // Adaptive bandwidths and log kernel prefactors ln(w / (2π h²))
    let mut bw_lo = f64::INFINITY;
    let mut bw_hi = 0.0_f64;
    let kernels: Vec<(f64, f64)> = thinned
        .iter()
        .zip(&nn)
        .map(|(s, &(_, dk))| {
            let h = (params.bandwidth_scale * dk)
                .clamp(params.min_bandwidth, params.max_bandwidth);
            bw_lo = bw_lo.min(h);
            bw_hi = bw_hi.max(h);
            let ln_pref = if s.weight > 0.0 {
                s.weight.ln() - (DPI * h * h).ln()
            } else {
                f64::NEG_INFINITY
            };
            (h, ln_pref)
        })
        .collect();
    debug!(
        "kde: {} samples, order {}, bandwidths [{:.2e}, {:.2e}] rad",
        n, order, bw_lo, bw_hi
    );

    // Evaluate the estimator at every pixel center
    let npix = healpix::n_pixels(order) as usize;
    let evals: Vec<(f64, f64, f64)> = (0..npix)
        .into_par_iter()
        .map(|p| {
            let (ra, dec) = healpix::pixel_to_ang(p as PixelId, order)?;
            Ok(eval_pixel(
                &unit_vector(ra, dec),
                &thinned,
                &vectors,
                &kernels,
                has_distance,
            ))
        })
        .collect::<Result<Vec<_>, SkylocError>>()?;

    let gmax = evals
        .iter()
        .map(|&(ln_f, _, _)| ln_f)
        .fold(f64::NEG_INFINITY, f64::max);
    if !gmax.is_finite() {
        return Err(SkylocError::DegenerateLikelihood);
    }

    let masses: Vec<f64> = evals.iter().map(|&(ln_f, _, _)| (ln_f - gmax).exp()).collect();
    let distance = has_distance.then(|| {
        DistanceLayer::new(
            evals.iter().map(|&(_, m, _)| m).collect(),
            evals.iter().map(|&(_, _, s)| s).collect(),
        )
    });
    SkyMap::from_masses(order, masses, distance)
}

/// Log density and conditional distance moments at one pixel center.
///
/// Two passes over the samples: one for the running maximum (log-sum-exp
/// shift), one for the shifted accumulation. Sample order is fixed, so the
/// result is deterministic.
fn eval_pixel(
    center: &Vector3<f64>,
    samples: &[SkySample],
    vectors: &[Vector3<f64>],
    kernels: &[(f64, f64)],
    has_distance: bool,
) -> (f64, f64, f64) {
    let term = |i: usize| {
        let (h, ln_pref) = kernels[i];
        let sep = angular_separation(center, &vectors[i]);
        ln_pref - 0.5 * (sep / h) * (sep / h)
    };

    let mut tmax = f64::NEG_INFINITY;
    for i in 0..samples.len() {
        tmax = tmax.max(term(i));
    }
    if !tmax.is_finite() {
        return (f64::NEG_INFINITY, f64::NAN, f64::NAN);
    }

    let mut m0 = 0.0;
    let mut m1 = 0.0;
    let mut m2 = 0.0;
    for (i, s) in samples.iter().enumerate() {
        let e = (term(i) - tmax).exp();
        m0 += e;
        if has_distance {
            let r = s.distance.unwrap_or(f64::NAN);
            m1 += e * r;
            m2 += e * r * r;
        }
    }

    let ln_f = tmax + m0.ln();
    if has_distance {
        let mean = m1 / m0;
        let var = (m2 / m0 - mean * mean).max(0.0);
        (ln_f, mean, var.sqrt())
    } else {
        (ln_f, f64::NAN, f64::NAN)
    }
}

/// Check cardinality, finiteness and weight/distance domains; returns
/// whether the set carries distances.
fn validate_samples(samples: &[SkySample], params: &KdeParams) -> Result<bool, SkylocError> {
    if samples.len() < params.min_samples {
        return Err(SkylocError::InsufficientSamples {
            got: samples.len(),
            min: params.min_samples,
        });
    }
    let has_distance = samples[0].distance.is_some();
    let mut weight_sum = 0.0;
    for (i, s) in samples.iter().enumerate() {
        if !s.ra.is_finite() || !s.dec.is_finite() {
            return Err(SkylocError::invalid_at(
                i,
                format!("non-finite sample coordinates (ra={}, dec={})", s.ra, s.dec),
            ));
        }
        if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2).contains(&s.dec) {
            return Err(SkylocError::invalid_at(
                i,
                format!("declination {} outside [-pi/2, pi/2]", s.dec),
            ));
        }
        if !s.weight.is_finite() || s.weight < 0.0 {
            return Err(SkylocError::invalid_at(i, format!("weight {}", s.weight)));
        }
        weight_sum += s.weight;
        match (has_distance, s.distance) {
            (true, Some(d)) => {
                if !d.is_finite() || d <= 0.0 {
                    return Err(SkylocError::invalid_at(i, format!("distance {d}")));
                }
            }
            (false, None) => {}
            _ => {
                return Err(SkylocError::invalid_at(
                    i,
                    "distance present on some samples but not all",
                ));
            }
        }
    }
    if weight_sum <= 0.0 {
        return Err(SkylocError::InvalidInput(
            "all sample weights are zero".into(),
        ));
    }
    Ok(has_distance)
}

/// Evenly spaced, order-preserving thinning that always keeps the first
/// and last samples. Purely index-based, so repeated runs agree exactly.
fn stride_subsample(samples: &[SkySample], cap: usize) -> Vec<SkySample> {
    let n = samples.len();
    (0..cap)
        .map(|j| samples[j * (n - 1) / (cap - 1)])
        .collect()
}

//! Adaptive sky-map construction for the localization engine.
//!
//! The marginalized posterior density is evaluated at the center of every
//! pixel of a coarse starting order, then the pixelization is refined where
//! the mass concentrates: any tile holding more than the configured share
//! of the running total is split into its 4 NESTED children and
//! re-evaluated, one order per round, until `max_order`. Evaluated tiles
//! live in an arena keyed by `(order, pixel)`; the surviving leaves are
//! finally rendered at the finest retained order and normalized.
//!
//! Pixel evaluations are embarrassingly parallel and are dispatched with
//! `rayon`; results are collected in pixel order and every reduction uses
//! the fixed-order [`tree_sum`](crate::numerics::tree_sum), so the output
//! is reproducible bit-for-bit regardless of thread count.

use ahash::AHashMap;
use itertools::{Either, Itertools};
use log::debug;
use rayon::prelude::*;

use crate::bayestar::likelihood::{NetworkLikelihood, PixelEval};
use crate::bayestar::{BayestarParams, DetectorTrigger, MIN_DETECTORS};
use crate::constants::{HpxOrder, PixelId};
use crate::healpix;
use crate::numerics::tree_sum;
use crate::skyloc_errors::SkylocError;
use crate::skymap::{DistanceLayer, SkyMap};

/// One evaluated tile of the adaptive pixelization.
type TileKey = (HpxOrder, PixelId);

/// Compute the localization sky map for a set of matched-filter triggers.
///
/// Arguments
/// ---------
/// * `triggers`: one [`DetectorTrigger`] per participating site.
/// * `params`: marginalization and refinement configuration.
///
/// Return
/// ------
/// * A normalized [`SkyMap`] at the finest refined order, carrying the
///   per-pixel conditional distance summary.
///
/// Errors
/// ------
/// * [`SkylocError::InsufficientData`] with fewer than 2 triggers.
/// * [`SkylocError::InvalidInput`] for non-finite or out-of-domain trigger
///   fields (the offending index is named).
/// * [`SkylocError::DegenerateLikelihood`] if the posterior underflows to
///   zero over the whole sky — a mis-specified prior or time window is
///   reported, never a silently uniform map.
pub fn localize(
    triggers: &[DetectorTrigger],
    params: &BayestarParams,
) -> Result<SkyMap, SkylocError> {
    if triggers.len() < MIN_DETECTORS {
        return Err(SkylocError::InsufficientData {
            got: triggers.len(),
            min: MIN_DETECTORS,
        });
    }
    for (i, t) in triggers.iter().enumerate() {
        t.validate(i)?;
    }

    let like = NetworkLikelihood::new(triggers, params);

    // Coarse pass over the full sky
    let base_pixels: Vec<TileKey> = (0..healpix::n_pixels(params.base_order))
        .map(|p| (params.base_order, p))
        .collect();
    let mut arena: AHashMap<TileKey, PixelEval> = AHashMap::new();
    let mut leaves = evaluate_tiles(&like, &base_pixels, &mut arena)?;

    // Refinement rounds: one order per round
    for order in params.base_order..params.max_order {
        // Tile masses under a shared exponent shift so strong signals do
        // not overflow and weak ones do not underflow to an all-zero round.
        let ln_masses: Vec<f64> = leaves
            .iter()
            .map(|&(o, p)| arena[&(o, p)].ln_post + healpix::pixel_area(o).ln())
            .collect();
        let ln_shift = ln_masses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !ln_shift.is_finite() {
            break;
        }
        let masses: Vec<f64> = ln_masses.iter().map(|&m| (m - ln_shift).exp()).collect();
        let total = tree_sum(&masses);

        let (refine, keep): (Vec<TileKey>, Vec<TileKey>) =
            leaves.iter().zip(&masses).partition_map(|(&(o, p), &m)| {
                if o == order && m / total > params.refine_threshold {
                    Either::Left((o, p))
                } else {
                    Either::Right((o, p))
                }
            });
        if refine.is_empty() {
            break;
        }
        debug!(
            "refining {} of {} tiles at order {} -> {}",
            refine.len(),
            refine.len() + keep.len(),
            order,
            order + 1
        );

        let mut child_keys = Vec::with_capacity(refine.len() * 4);
        for &(o, p) in &refine {
            for child in healpix::children(p, o)? {
                child_keys.push((o + 1, child));
            }
        }
        let children = evaluate_tiles(&like, &child_keys, &mut arena)?;

        leaves = keep;
        leaves.extend(children);
    }

    flatten(&leaves, &arena)
}

/// Evaluate the posterior at the center of each listed tile, in parallel,
/// and record the results in the arena.
fn evaluate_tiles(
    like: &NetworkLikelihood<'_>,
    keys: &[TileKey],
    arena: &mut AHashMap<TileKey, PixelEval>,
) -> Result<Vec<TileKey>, SkylocError> {
    let evals: Vec<PixelEval> = keys
        .par_iter()
        .map(|&(order, pix)| {
            let (ra, dec) = healpix::pixel_to_ang(pix, order)?;
            Ok(like.evaluate(ra, dec))
        })
        .collect::<Result<Vec<_>, SkylocError>>()?;
    arena.extend(keys.iter().copied().zip(evals));
    Ok(keys.to_vec())
}

/// Render the leaves at the finest retained order and normalize.
fn flatten(
    leaves: &[TileKey],
    arena: &AHashMap<TileKey, PixelEval>,
) -> Result<SkyMap, SkylocError> {
    let target = leaves.iter().map(|&(o, _)| o).max().unwrap_or(0);
    let gmax = leaves
        .iter()
        .map(|k| arena[k].ln_post)
        .fold(f64::NEG_INFINITY, f64::max);
    if !gmax.is_finite() {
        return Err(SkylocError::DegenerateLikelihood);
    }

    let npix = healpix::n_pixels(target) as usize;
    let mut masses = vec![0.0; npix];
    let mut dist_mean = vec![f64::NAN; npix];
    let mut dist_std = vec![f64::NAN; npix];
    for &(order, pix) in leaves {
        let eval = &arena[&(order, pix)];
        let shift = 2 * (target - order) as u32;
        let first = (pix << shift) as usize;
        let count = 1_usize << shift;
        // A leaf spreads its density uniformly over its descendants, so the
        // per-target-pixel mass is density × target-pixel area; the common
        // area factor cancels in the normalization.
        let value = (eval.ln_post - gmax).exp();
        for slot in first..first + count {
            masses[slot] = value;
            dist_mean[slot] = eval.dist_mean;
            dist_std[slot] = eval.dist_std;
        }
    }

    debug!(
        "flattened {} leaves to order {} ({} pixels)",
        leaves.len(),
        target,
        npix
    );
    SkyMap::from_masses(target, masses, Some(DistanceLayer::new(dist_mean, dist_std)))
}

//! # Credible regions and localization diagnostics
//!
//! Shared summary statistics over a finalized [`SkyMap`]: the per-pixel
//! credible levels (the greedy minimal-region construction), the area
//! enclosed at a given level, and the searched area against a known true
//! direction — the standard retrospective accuracy diagnostic.
//!
//! All functions are deterministic given a finalized map: the probability
//! sort breaks ties by pixel index, so equal-mass pixels always enter the
//! credible region in the same order.

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::constants::Radian;
use crate::healpix;
use crate::skyloc_errors::SkylocError;
use crate::skymap::SkyMap;

/// Per-pixel credible levels.
///
/// Pixels are ranked by descending probability (ties by ascending index)
/// and assigned the cumulative probability up to and including themselves:
/// the minimal credible level at which each pixel joins the credible
/// region. Higher-probability pixels therefore receive levels ≤ those of
/// lower-probability pixels.
///
/// Return
/// ------
/// * One level in (0, 1] per pixel, in NESTED pixel order.
pub fn credible_levels(map: &SkyMap) -> Vec<f64> {
    let probs = map.probs();
    let order = (0..probs.len())
        .sorted_by(|&a, &b| {
            OrderedFloat(probs[b])
                .cmp(&OrderedFloat(probs[a]))
                .then(a.cmp(&b))
        })
        .collect::<Vec<_>>();

    let mut levels = vec![0.0; probs.len()];
    let mut cumulative = 0.0;
    for i in order {
        cumulative += probs[i];
        levels[i] = cumulative;
    }
    levels
}

/// Sky area of the credible region at a level, in square degrees.
///
/// Arguments
/// ---------
/// * `map`: a finalized sky map.
/// * `level`: requested credible level in [0, 1] (e.g. 0.9).
///
/// Return
/// ------
/// * The solid angle of the smallest pixel set whose cumulative mass
///   reaches `level`, in deg².
///
/// Errors
/// ------
/// * [`SkylocError::InvalidInput`] for a non-finite level or one outside
///   [0, 1].
pub fn area_at_level(map: &SkyMap, level: f64) -> Result<f64, SkylocError> {
    check_level(level)?;
    if level == 0.0 {
        return Ok(0.0);
    }
    let levels = credible_levels(map);
    // Pixels strictly inside the region, plus the one that crosses the
    // requested mass; the set must actually reach `level`.
    let below = levels.iter().filter(|&&c| c < level).count();
    let crossing = usize::from(below < levels.len());
    Ok((below + crossing) as f64 * map.pixel_area_deg2())
}

/// Searched area for a known true direction, in square degrees.
///
/// The area of the smallest credible region that contains the pixel
/// covering `(ra, dec)` — equivalently, the total area of all pixels at
/// least as probable as that pixel.
///
/// Errors
/// ------
/// * [`SkylocError::InvalidInput`] for non-finite coordinates.
pub fn searched_area(map: &SkyMap, ra: Radian, dec: Radian) -> Result<f64, SkylocError> {
    let pix = healpix::ang_to_pixel(ra, dec, map.order())?;
    let levels = credible_levels(map);
    let target = levels[pix as usize];
    let count = levels.iter().filter(|&&c| c <= target).count();
    Ok(count as f64 * map.pixel_area_deg2())
}

/// Credible level at which the pixel covering the true direction joins the
/// region; the companion probability diagnostic to [`searched_area`].
pub fn searched_probability(map: &SkyMap, ra: Radian, dec: Radian) -> Result<f64, SkylocError> {
    let pix = healpix::ang_to_pixel(ra, dec, map.order())?;
    Ok(credible_levels(map)[pix as usize])
}

/// `(level, enclosed area in deg²)` pairs for a requested set of levels
/// (commonly 50% and 90%).
pub fn credible_summary(map: &SkyMap, levels: &[f64]) -> Result<Vec<(f64, f64)>, SkylocError> {
    levels
        .iter()
        .map(|&l| Ok((l, area_at_level(map, l)?)))
        .collect()
}

fn check_level(level: f64) -> Result<(), SkylocError> {
    if !level.is_finite() || !(0.0..=1.0).contains(&level) {
        return Err(SkylocError::InvalidInput(format!(
            "credible level {level} outside [0, 1]"
        )));
    }
    Ok(())
}

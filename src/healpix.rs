//! # Hierarchical equal-area pixelization of the sky (HEALPix, NESTED scheme)
//!
//! This module implements the subset of HEALPix needed by the sky-map
//! engines: pixel indexing at a given resolution order, center lookup,
//! neighbor sets and hierarchical subdivision. The NESTED numbering is used
//! throughout because it makes the parent/child relation a pair of bit
//! shifts, which is what the adaptive refinement of the localization engine
//! relies on.
//!
//! ## Conventions
//!
//! - `order` is the resolution exponent: `nside = 2^order`,
//!   `n_pixels = 12 · 4^order`. Orders above [`MAX_ORDER`] are rejected
//!   with [`SkylocError::OutOfRange`] to bound memory growth.
//! - Sky directions are equatorial `(ra, dec)` in **radians**,
//!   `ra ∈ [0, 2π)` (any finite value is wrapped), `dec ∈ [-π/2, π/2]`.
//! - Pixel indices are the standard NESTED indices: the top 4 bits beyond
//!   `2·order` select one of the 12 base faces, the remaining bits
//!   interleave the face-local `(x, y)` coordinates.
//!
//! All operations are deterministic and side-effect free.
//!
//! ## References
//!
//! * Górski et al. (2005), ApJ 622, 759 — the HEALPix scheme and the
//!   equatorial/polar indexing formulae implemented here.

use smallvec::SmallVec;

use crate::constants::{HpxOrder, PixelId, Radian, DPI};
use crate::skyloc_errors::SkylocError;

/// Maximum supported resolution order (`nside = 2048`, ~50M pixels).
///
/// Bounds the memory of a flattened map to a few hundred MB; requests above
/// this fail with [`SkylocError::OutOfRange`].
pub const MAX_ORDER: HpxOrder = 11;

/// Row index of the southernmost corner of each base face, counted from the
/// north pole in units of `nside`.
const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];

/// Longitude index of the base-face center, in units of `π/4 / nside`.
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Validate a resolution order against [`MAX_ORDER`].
pub fn check_order(order: HpxOrder) -> Result<(), SkylocError> {
    if order > MAX_ORDER {
        return Err(SkylocError::OutOfRange {
            requested: order,
            max: MAX_ORDER,
        });
    }
    Ok(())
}

/// `nside = 2^order`.
#[inline]
pub fn nside(order: HpxOrder) -> u64 {
    1_u64 << order
}

/// Number of pixels at the given order: `12 · 4^order`.
#[inline]
pub fn n_pixels(order: HpxOrder) -> u64 {
    12_u64 << (2 * order)
}

/// Solid angle of one pixel at the given order, in steradians.
///
/// All pixels of one order share the same area (the scheme is equal-area).
#[inline]
pub fn pixel_area(order: HpxOrder) -> f64 {
    2.0 * DPI / n_pixels(order) as f64
}

/// Angular radius of the equal-area disc of one pixel, in radians.
///
/// The true pixel shape is a curvilinear quadrilateral; its farthest corner
/// lies within ~1.6× this radius for every order.
#[inline]
pub fn pixel_radius(order: HpxOrder) -> f64 {
    (pixel_area(order) / std::f64::consts::PI).sqrt()
}

// -------------------------------------------------------------------------------------------------
// Bit interleaving between face-local (x, y) and the NESTED index
// -------------------------------------------------------------------------------------------------

/// Spread the low 32 bits of `v` into the even bit positions.
#[inline]
fn spread_bits(v: u64) -> u64 {
    let mut x = v & 0x0000_0000_ffff_ffff;
    x = (x | (x << 16)) & 0x0000_ffff_0000_ffff;
    x = (x | (x << 8)) & 0x00ff_00ff_00ff_00ff;
    x = (x | (x << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

/// Inverse of [`spread_bits`]: gather the even bit positions of `v`.
#[inline]
fn compress_bits(v: u64) -> u64 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | (x >> 4)) & 0x00ff_00ff_00ff_00ff;
    x = (x | (x >> 8)) & 0x0000_ffff_0000_ffff;
    x = (x | (x >> 16)) & 0x0000_0000_ffff_ffff;
    x
}

/// Assemble a NESTED index from face number and face-local coordinates.
#[inline]
fn xyf_to_nest(x: u64, y: u64, face: u64, order: HpxOrder) -> PixelId {
    (face << (2 * order)) | spread_bits(x) | (spread_bits(y) << 1)
}

/// Decompose a NESTED index into face number and face-local coordinates.
#[inline]
fn nest_to_xyf(pix: PixelId, order: HpxOrder) -> (u64, u64, u64) {
    let face = pix >> (2 * order);
    let ipf = pix & (nside(order) * nside(order) - 1);
    (compress_bits(ipf), compress_bits(ipf >> 1), face)
}

// -------------------------------------------------------------------------------------------------
// Direction ↔ pixel
// -------------------------------------------------------------------------------------------------

/// NESTED pixel index containing the direction `(ra, dec)`.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in radians (any finite value, wrapped to [0, 2π)).
/// * `dec`: declination in radians, in [-π/2, π/2].
/// * `order`: resolution order.
///
/// Return
/// ------
/// * The NESTED index of the pixel whose footprint contains the direction.
///
/// Errors
/// ------
/// * [`SkylocError::OutOfRange`] if `order > MAX_ORDER`.
/// * [`SkylocError::InvalidInput`] for non-finite coordinates or a
///   declination outside [-π/2, π/2].
pub fn ang_to_pixel(ra: Radian, dec: Radian, order: HpxOrder) -> Result<PixelId, SkylocError> {
    check_order(order)?;
    if !ra.is_finite() || !dec.is_finite() {
        return Err(SkylocError::InvalidInput(format!(
            "non-finite sky direction (ra={ra}, dec={dec})"
        )));
    }
    if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2).contains(&dec) {
        return Err(SkylocError::InvalidInput(format!(
            "declination {dec} outside [-pi/2, pi/2]"
        )));
    }
    let z = dec.sin();
    let phi = ra.rem_euclid(DPI);
    Ok(zphi_to_pixel(z, phi, order))
}

/// Core of [`ang_to_pixel`] on the (z = sin dec, phi) parametrization.
fn zphi_to_pixel(z: f64, phi: f64, order: HpxOrder) -> PixelId {
    let ns = nside(order) as i64;
    let za = z.abs();
    // Longitude in units of quarter-turns, in [0, 4)
    let tt = (phi / (DPI / 4.0)).rem_euclid(4.0);

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        // Equatorial region: indices of the two edge lines crossing the point
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * (z * 0.75);
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp / ns;
        let ifm = jm / ns;
        let face = if ifp == ifm {
            (ifp & 3) + 4
        } else if ifp < ifm {
            ifp & 3
        } else {
            (ifm & 3) + 8
        };
        let ix = jm & (ns - 1);
        let iy = ns - (jp & (ns - 1)) - 1;
        (face, ix, iy)
    } else {
        // Polar caps
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z >= 0.0 {
            (ntt, ns - jm - 1, ns - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    xyf_to_nest(ix as u64, iy as u64, face as u64, order)
}

/// Center direction `(ra, dec)` of a pixel, in radians.
///
/// Arguments
/// ---------
/// * `pix`: NESTED pixel index.
/// * `order`: resolution order.
///
/// Errors
/// ------
/// * [`SkylocError::OutOfRange`] if `order > MAX_ORDER`.
/// * [`SkylocError::InvalidInput`] if `pix` is not a valid index at `order`.
pub fn pixel_to_ang(pix: PixelId, order: HpxOrder) -> Result<(Radian, Radian), SkylocError> {
    check_order(order)?;
    if pix >= n_pixels(order) {
        return Err(SkylocError::InvalidInput(format!(
            "pixel {pix} out of bounds at order {order} ({} pixels)",
            n_pixels(order)
        )));
    }

    let ns = nside(order) as i64;
    let nl4 = 4 * ns;
    let fact2 = 4.0 / n_pixels(order) as f64;
    let (ix, iy, face) = nest_to_xyf(pix, order);
    let (ix, iy, face) = (ix as i64, iy as i64, face as usize);

    // Ring index counted from the north pole
    let jr = (JRLL[face] << order) - ix - iy - 1;

    let (nr, z, kshift) = if jr < ns {
        // North polar cap
        let nr = jr;
        (nr, 1.0 - (nr * nr) as f64 * fact2, 0)
    } else if jr > 3 * ns {
        // South polar cap
        let nr = nl4 - jr;
        (nr, (nr * nr) as f64 * fact2 - 1.0, 0)
    } else {
        // Equatorial belt
        let fact1 = 2.0 * ns as f64 * fact2;
        (ns, (2 * ns - jr) as f64 * fact1, (jr - ns) & 1)
    };

    let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    }
    if jp < 1 {
        jp += nl4;
    }

    let ra = (jp as f64 - (kshift + 1) as f64 * 0.5) * (DPI / 4.0) / nr as f64;
    let dec = z.clamp(-1.0, 1.0).asin();
    Ok((ra, dec))
}

// -------------------------------------------------------------------------------------------------
// Neighbors and hierarchy
// -------------------------------------------------------------------------------------------------

/// Face-local steps toward the 8 surrounding pixels (SW, W, NW, N, NE, E, SE, S).
const NB_XOFFSET: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
const NB_YOFFSET: [i64; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

/// Destination face when a step leaves the current face, indexed by
/// crossing direction (0..9) and face; -1 marks a missing diagonal
/// neighbor at a face corner.
const NB_FACEARRAY: [[i64; 12]; 9] = [
    [8, 9, 10, 11, -1, -1, -1, -1, 10, 11, 8, 9], // S
    [5, 6, 7, 4, 8, 9, 10, 11, 9, 10, 11, 8],     // SE
    [-1, -1, -1, -1, 5, 6, 7, 4, -1, -1, -1, -1], // E
    [4, 5, 6, 7, 11, 8, 9, 10, 11, 8, 9, 10],     // SW
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],       // center
    [1, 2, 3, 0, 0, 1, 2, 3, 5, 6, 7, 4],         // NE
    [-1, -1, -1, -1, 7, 4, 5, 6, -1, -1, -1, -1], // W
    [3, 0, 1, 2, 3, 0, 1, 2, 4, 5, 6, 7],         // N
    [2, 3, 0, 1, -1, -1, -1, -1, 6, 7, 4, 5],     // NW
];

/// Coordinate swap/flip applied after a face crossing, indexed by crossing
/// direction and face group (north caps, equator, south caps). Bit 1 flips
/// x, bit 2 flips y, bit 4 transposes.
const NB_SWAPARRAY: [[i64; 3]; 9] = [
    [0, 0, 3], // S
    [0, 0, 6], // SE
    [0, 0, 0], // E
    [0, 0, 5], // SW
    [0, 0, 0], // center
    [5, 0, 0], // NE
    [0, 0, 0], // W
    [6, 0, 0], // N
    [3, 0, 0], // NW
];

/// Pixels sharing an edge or a corner with `pix`.
///
/// Most pixels have 8 neighbors; the 8 pixels sitting on a face corner that
/// is also a pixelization vertex have 7. The result is sorted ascending and
/// deduplicated, so it is a deterministic set.
///
/// Errors
/// ------
/// * [`SkylocError::OutOfRange`] if `order > MAX_ORDER`.
/// * [`SkylocError::InvalidInput`] if `pix` is not a valid index at `order`.
pub fn neighbors(pix: PixelId, order: HpxOrder) -> Result<SmallVec<[PixelId; 8]>, SkylocError> {
    check_order(order)?;
    if pix >= n_pixels(order) {
        return Err(SkylocError::InvalidInput(format!(
            "pixel {pix} out of bounds at order {order}"
        )));
    }

    let ns = nside(order) as i64;
    let (ix0, iy0, face) = nest_to_xyf(pix, order);
    let (ix0, iy0, face) = (ix0 as i64, iy0 as i64, face as usize);

    let mut out: SmallVec<[PixelId; 8]> = SmallVec::new();
    for dir in 0..8 {
        let mut x = ix0 + NB_XOFFSET[dir];
        let mut y = iy0 + NB_YOFFSET[dir];
        let mut nbnum = 4_usize;
        if x < 0 {
            x += ns;
            nbnum -= 1;
        } else if x >= ns {
            x -= ns;
            nbnum += 1;
        }
        if y < 0 {
            y += ns;
            nbnum -= 3;
        } else if y >= ns {
            y -= ns;
            nbnum += 3;
        }

        let f = NB_FACEARRAY[nbnum][face];
        if f < 0 {
            continue;
        }
        let bits = NB_SWAPARRAY[nbnum][face >> 2];
        if bits & 1 != 0 {
            x = ns - x - 1;
        }
        if bits & 2 != 0 {
            y = ns - y - 1;
        }
        if bits & 4 != 0 {
            std::mem::swap(&mut x, &mut y);
        }
        out.push(xyf_to_nest(x as u64, y as u64, f as u64, order));
    }

    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// The 4 children of a pixel at the next finer order.
///
/// NESTED indexing makes subdivision a shift: the children of `p` at
/// `order + 1` are `4p .. 4p + 3`, and their footprints tile the parent
/// exactly.
///
/// Errors
/// ------
/// * [`SkylocError::OutOfRange`] if `order + 1 > MAX_ORDER` (refinement
///   beyond the supported maximum).
/// * [`SkylocError::InvalidInput`] if `pix` is not a valid index at `order`.
pub fn children(pix: PixelId, order: HpxOrder) -> Result<[PixelId; 4], SkylocError> {
    check_order(order)?;
    check_order(order + 1)?;
    if pix >= n_pixels(order) {
        return Err(SkylocError::InvalidInput(format!(
            "pixel {pix} out of bounds at order {order}"
        )));
    }
    let base = pix << 2;
    Ok([base, base + 1, base + 2, base + 3])
}

/// The parent of a pixel at the next coarser order.
#[inline]
pub fn parent(pix: PixelId) -> PixelId {
    pix >> 2
}

// -------------------------------------------------------------------------------------------------
// Spherical geometry helpers
// -------------------------------------------------------------------------------------------------

/// Unit vector of an equatorial direction, `(x, y, z)` with z toward the
/// north celestial pole.
#[inline]
pub fn unit_vector(ra: Radian, dec: Radian) -> nalgebra::Vector3<f64> {
    let cd = dec.cos();
    nalgebra::Vector3::new(ra.cos() * cd, ra.sin() * cd, dec.sin())
}

/// Angular separation between two unit vectors, in radians.
///
/// Uses `atan2(|a × b|, a · b)`, which stays accurate for both small and
/// near-antipodal separations.
#[inline]
pub fn angular_separation(a: &nalgebra::Vector3<f64>, b: &nalgebra::Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

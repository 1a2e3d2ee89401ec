//! # Constants and type definitions for skyloc
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the `skyloc` library. It also defines the container types used
//! to pass detector triggers between the localization stages.
//!
//! ## Overview
//!
//! - Physical constants (speed of light, megaparsec)
//! - Unit conversions (degrees ↔ radians, steradians ↔ square degrees)
//! - Core type aliases used across the crate
//! - Container types for per-event detector trigger sets
//!
//! These definitions are used by all main modules, including the pixelization, the signal model
//! and both sky-map engines.

use crate::bayestar::DetectorTrigger;
use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Speed of light in vacuum, in m/s (CODATA, exact)
pub const VLIGHT: f64 = 2.99792458e8;

/// One megaparsec in meters (IAU 2015 resolution B2)
pub const MPC: f64 = 3.0856775814913673e22;

/// Numerical tolerance used for probability-mass comparisons
pub const PROB_EPS: f64 = 1e-6;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Square degrees per steradian
pub const DEG2_PER_STERAD: f64 = (180.0 / std::f64::consts::PI) * (180.0 / std::f64::consts::PI);

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Luminosity distance in megaparsecs
pub type Mpc = f64;
/// Time in seconds of the GPS time scale
pub type GpsSeconds = f64;

/// HEALPix resolution order; `nside = 2^order`
pub type HpxOrder = u8;

/// NESTED-scheme HEALPix pixel index at a given order
pub type PixelId = u64;

// -------------------------------------------------------------------------------------------------
// Data containers
// -------------------------------------------------------------------------------------------------

/// A small, inline-optimized container for the triggers of a single event.
///
/// Gravitational-wave networks are small (2–5 instruments), so the trigger
/// set of one event fits on the stack.
pub type TriggerSet = SmallVec<[DetectorTrigger; 4]>;

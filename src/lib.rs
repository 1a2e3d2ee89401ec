pub mod bayestar;
pub mod constants;
pub mod credible;
pub mod detectors;
pub mod healpix;
pub mod kde;
pub mod numerics;
pub mod signal_model;
pub mod skyloc_errors;
pub mod skymap;
pub mod time;

pub use bayestar::{localize, BayestarParams, DetectorTrigger, DistancePrior};
pub use constants::TriggerSet;
pub use credible::{area_at_level, credible_levels, credible_summary, searched_area};
pub use detectors::{Detector, DetectorGeometry};
pub use kde::{kde_sky_map, KdeParams, SkySample};
pub use skyloc_errors::SkylocError;
pub use skymap::{DistanceLayer, SkyMap};

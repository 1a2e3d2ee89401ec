//! Shared fixtures for the integration tests: detector geometries and
//! injected trigger sets.
//!
//! The detector catalog itself is outside the crate's scope, so the tests
//! define the three standard sites inline (Earth-fixed vertex coordinates
//! and arm directions of the LIGO Hanford, LIGO Livingston and Virgo
//! interferometers).

use std::sync::Arc;

use skyloc::bayestar::DetectorTrigger;
use skyloc::signal_model::{detector_response, predicted_snr};
use skyloc::{Detector, TriggerSet};

pub fn hanford() -> Detector {
    Detector::interferometer(
        "H1",
        [-2.16141492636e6, -3.83469517889e6, 4.60035022664e6],
        [-0.22389266154, 0.79983062746, 0.55690487831],
        [-0.91397818574, 0.02609403989, -0.40492342125],
    )
    .unwrap()
}

pub fn livingston() -> Detector {
    Detector::interferometer(
        "L1",
        [-7.42760447238e4, -5.49628371971e6, 3.22425701744e6],
        [-0.95457412153, -0.14158077340, -0.26218911324],
        [0.29774156894, -0.48791033647, -0.82054461286],
    )
    .unwrap()
}

pub fn virgo() -> Detector {
    Detector::interferometer(
        "V1",
        [4.54637409900e6, 8.42989697626e5, 4.37857696241e6],
        [-0.70045821479, 0.20848948619, 0.68256166277],
        [-0.05379255368, -0.96908180549, 0.24080451708],
    )
    .unwrap()
}

/// Parameters of one synthetic injection.
pub struct Injection {
    pub ra: f64,
    pub dec: f64,
    pub distance: f64,
    pub cos_inclination: f64,
    pub psi: f64,
    pub t0: f64,
    pub time_sigma: f64,
    pub amplitude_1mpc: f64,
}

impl Default for Injection {
    fn default() -> Self {
        Injection {
            ra: 3.446,
            dec: -0.408,
            distance: 40.0,
            cos_inclination: 0.85,
            psi: 0.6,
            t0: 1187008882.43,
            // Wide enough that the timing ring is resolved at the coarse
            // starting order of the tests.
            time_sigma: 1.0e-3,
            amplitude_1mpc: 1200.0,
        }
    }
}

/// Noise-free trigger set for an injected source, built with the same
/// signal model the engine inverts.
pub fn injected_triggers(detectors: &[Detector], inj: &Injection) -> TriggerSet {
    detectors
        .iter()
        .map(|det| {
            let resp = detector_response(det, inj.ra, inj.dec, inj.psi, inj.t0);
            let snr = predicted_snr(
                resp.fplus,
                resp.fcross,
                inj.cos_inclination,
                inj.distance,
                inj.amplitude_1mpc,
            );
            DetectorTrigger {
                detector: Arc::new(det.clone()),
                arrival_time: inj.t0 + resp.time_delay,
                time_sigma: inj.time_sigma,
                snr,
                amplitude_1mpc: inj.amplitude_1mpc,
            }
        })
        .collect()
}

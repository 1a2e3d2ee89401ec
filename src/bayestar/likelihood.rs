//! Marginalized coherent network likelihood.
//!
//! For one candidate sky direction the engine must integrate the network
//! likelihood over four nuisance parameters: coalescence phase, geocentric
//! arrival time, polarization angle, inclination — and over luminosity
//! distance with its prior. The factorization used here:
//!
//! - **Coalescence phase**: analytic. The phase enters as a rigid rotation
//!   of every predicted complex SNR, so the circular integral collapses to
//!   `ln I₀(|Σᵢ z̄ᵢ sᵢ|)`.
//! - **Geocentric time**: analytic. Arrival-time residuals are jointly
//!   Gaussian in the common geocentric time, so a flat prior integrates by
//!   completing the square (the classic timing-triangulation χ²).
//! - **Polarization × inclination**: tabulated midpoint grids (the
//!   integrand is smooth and periodic/bounded on both axes).
//! - **Distance**: Gauss–Legendre quadrature against the configured prior.
//!   The predicted SNR scales as 1/r, so per grid point only two scalars
//!   (`|Σ z̄ᵢcᵢ|` and `Σ|cᵢ|²`) are rescaled across distance nodes.
//!
//! Everything is accumulated in log space; the same quadrature weights
//! yield the per-pixel conditional distance moments at no extra cost.

use nalgebra::Complex;

use crate::bayestar::{BayestarParams, DetectorTrigger, DistancePrior};
use crate::constants::{GpsSeconds, Mpc, Radian};
use crate::detectors::antenna_pattern;
use crate::numerics::{gauss_legendre, ln_bessel_i0};
use crate::signal_model::predicted_snr;
use crate::time::gmst_from_gps;

/// Result of evaluating the marginalized posterior at one sky direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PixelEval {
    /// Unnormalized log posterior **density** (per steradian).
    pub ln_post: f64,
    /// Conditional mean luminosity distance, Mpc (NaN if the local
    /// evidence underflowed).
    pub dist_mean: Mpc,
    /// Conditional distance standard deviation, Mpc.
    pub dist_std: Mpc,
}

/// Precomputed marginalization tables and trigger-derived scalars for one
/// event; immutable, shared read-only across parallel pixel evaluations.
pub(crate) struct NetworkLikelihood<'a> {
    triggers: &'a [DetectorTrigger],
    /// Polarization-angle grid on [0, π).
    psi_grid: Vec<Radian>,
    /// Cosine-inclination midpoint grid on [-1, 1].
    u_grid: Vec<f64>,
    /// Distance quadrature nodes, Mpc.
    dist_nodes: Vec<Mpc>,
    /// `ln(wⱼ · p(rⱼ) / Z)` per node: quadrature weight times normalized prior.
    ln_dist_weights: Vec<f64>,
    /// GMST at the reference epoch; the Earth rotates negligibly over the
    /// few tens of milliseconds spanned by a trigger set.
    gmst_rad: f64,
    /// Inverse-variance weighted mean arrival time, subtracted before the
    /// analytic geocentric-time marginalization for conditioning.
    t_ref: GpsSeconds,
}

impl<'a> NetworkLikelihood<'a> {
    pub(crate) fn new(triggers: &'a [DetectorTrigger], params: &BayestarParams) -> Self {
        let n_psi = params.psi_steps;
        let psi_grid = (0..n_psi)
            .map(|k| std::f64::consts::PI * k as f64 / n_psi as f64)
            .collect();

        let n_u = params.inclination_steps;
        let u_grid = (0..n_u)
            .map(|b| -1.0 + (2 * b + 1) as f64 / n_u as f64)
            .collect();

        // Map the canonical Gauss-Legendre rule onto [min_distance, max_distance]
        let (nodes, weights) = gauss_legendre(params.distance_nodes);
        let half_span = 0.5 * (params.max_distance - params.min_distance);
        let mid = 0.5 * (params.max_distance + params.min_distance);
        let dist_nodes: Vec<Mpc> = nodes.iter().map(|x| mid + half_span * x).collect();
        let ln_norm = match params.prior {
            DistancePrior::UniformVolume => {
                ((params.max_distance.powi(3) - params.min_distance.powi(3)) / 3.0).ln()
            }
            DistancePrior::UniformDistance => (params.max_distance - params.min_distance).ln(),
        };
        let ln_dist_weights = dist_nodes
            .iter()
            .zip(&weights)
            .map(|(&r, &w)| {
                let ln_prior = match params.prior {
                    DistancePrior::UniformVolume => 2.0 * r.ln(),
                    DistancePrior::UniformDistance => 0.0,
                };
                (w * half_span).ln() + ln_prior - ln_norm
            })
            .collect();

        // Inverse-variance weighted reference epoch
        let mut wsum = 0.0;
        let mut twsum = 0.0;
        for t in triggers {
            let w = 1.0 / (t.time_sigma * t.time_sigma);
            wsum += w;
            twsum += w * t.arrival_time;
        }
        let t_ref = twsum / wsum;

        NetworkLikelihood {
            triggers,
            psi_grid,
            u_grid,
            dist_nodes,
            ln_dist_weights,
            gmst_rad: gmst_from_gps(t_ref),
            t_ref,
        }
    }

    /// Marginalized log posterior density and conditional distance moments
    /// at one sky direction.
    pub(crate) fn evaluate(&self, ra: Radian, dec: Radian) -> PixelEval {
        // --- Timing term: analytic marginalization over geocentric time ---
        let mut wsum = 0.0;
        let mut dsum = 0.0;
        let mut d2sum = 0.0;
        for t in self.triggers {
            let delay = crate::detectors::time_delay_from_geocenter(
                &t.detector,
                ra,
                dec,
                self.gmst_rad,
            );
            let resid = (t.arrival_time - self.t_ref) - delay;
            let w = 1.0 / (t.time_sigma * t.time_sigma);
            wsum += w;
            dsum += w * resid;
            d2sum += w * resid * resid;
        }
        // Direction-independent normalization constants are dropped; the
        // map is renormalized at the end anyway.
        let ln_timing = -0.5 * (d2sum - dsum * dsum / wsum);

        // --- Amplitude/phase term over the (psi, u, r) grid ---
        let n_det = self.triggers.len();
        let n_r = self.dist_nodes.len();
        let mut values = Vec::with_capacity(self.psi_grid.len() * self.u_grid.len() * n_r);
        let mut coeffs: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n_det];

        for &psi in &self.psi_grid {
            let patterns: Vec<_> = self
                .triggers
                .iter()
                .map(|t| antenna_pattern(&t.detector, ra, dec, psi, self.gmst_rad))
                .collect();
            for &u in &self.u_grid {
                // Predicted SNR at unit inverse distance; 1/r scaling is
                // applied per quadrature node below.
                for (c, (t, p)) in coeffs.iter_mut().zip(self.triggers.iter().zip(&patterns)) {
                    *c = predicted_snr(p.fplus, p.fcross, u, 1.0, t.amplitude_1mpc);
                }
                let cross: Complex<f64> = self
                    .triggers
                    .iter()
                    .zip(&coeffs)
                    .map(|(t, c)| t.snr.conj() * c)
                    .sum();
                let b = cross.norm();
                let c2: f64 = coeffs.iter().map(|c| c.norm_sqr()).sum();

                for (j, &r) in self.dist_nodes.iter().enumerate() {
                    let g = ln_bessel_i0(b / r) - 0.5 * c2 / (r * r) + self.ln_dist_weights[j];
                    values.push(g);
                }
            }
        }

        let gmax = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !gmax.is_finite() {
            return PixelEval {
                ln_post: f64::NEG_INFINITY,
                dist_mean: f64::NAN,
                dist_std: f64::NAN,
            };
        }

        // Single pass for the evidence and the distance moments
        let mut m0 = 0.0;
        let mut m1 = 0.0;
        let mut m2 = 0.0;
        for (idx, &g) in values.iter().enumerate() {
            let r = self.dist_nodes[idx % n_r];
            let e = (g - gmax).exp();
            m0 += e;
            m1 += e * r;
            m2 += e * r * r;
        }
        let ln_grid_weight = -((self.psi_grid.len() * self.u_grid.len()) as f64).ln();
        let ln_amp = gmax + m0.ln() + ln_grid_weight;

        let mean = m1 / m0;
        let var = (m2 / m0 - mean * mean).max(0.0);
        PixelEval {
            ln_post: ln_timing + ln_amp,
            dist_mean: mean,
            dist_std: var.sqrt(),
        }
    }
}

#[cfg(test)]
mod likelihood_test {
    use super::*;
    use crate::bayestar::BayestarParams;
    use crate::detectors::Detector;
    use crate::signal_model::detector_response;
    use std::sync::Arc;

    /// Three toy sites spread around the globe, with injected triggers for
    /// a source at (ra, dec) and the given distance.
    fn injected_triggers(ra: f64, dec: f64, distance: f64) -> Vec<DetectorTrigger> {
        let t0 = 1187008882.4;
        let sites = [
            Detector::interferometer(
                "A1",
                [6.0e6, 0.0, 1.0e6],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            )
            .unwrap(),
            Detector::interferometer(
                "B1",
                [0.0, 6.0e6, -1.0e6],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
            )
            .unwrap(),
            Detector::interferometer(
                "C1",
                [-4.0e6, -4.0e6, 2.0e6],
                [0.7, -0.7, 0.0],
                [0.5, 0.5, 0.7],
            )
            .unwrap(),
        ];
        sites
            .into_iter()
            .map(|det| {
                let resp = detector_response(&det, ra, dec, 0.3, t0);
                let snr = predicted_snr(resp.fplus, resp.fcross, 0.8, distance, 2000.0);
                DetectorTrigger {
                    detector: Arc::new(det),
                    arrival_time: t0 + resp.time_delay,
                    time_sigma: 1.0e-4,
                    snr,
                    amplitude_1mpc: 2000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_true_direction_beats_antipode() {
        let (ra, dec) = (3.3, 0.6);
        let triggers = injected_triggers(ra, dec, 120.0);
        let params = BayestarParams::builder().build().unwrap();
        let like = NetworkLikelihood::new(&triggers, &params);

        let at_true = like.evaluate(ra, dec);
        let at_antipode = like.evaluate(ra + std::f64::consts::PI, -dec);
        assert!(at_true.ln_post > at_antipode.ln_post + 10.0);
        assert!(at_true.dist_mean > 0.0);
    }

    #[test]
    fn test_distance_moments_bracket_injection() {
        let (ra, dec) = (1.0, -0.2);
        let distance = 150.0;
        let triggers = injected_triggers(ra, dec, distance);
        let params = BayestarParams::builder()
            .max_distance(800.0)
            .distance_nodes(64)
            .build()
            .unwrap();
        let like = NetworkLikelihood::new(&triggers, &params);
        let eval = like.evaluate(ra, dec);
        // The conditional distance at the true direction should cover the
        // injected value within a few standard deviations.
        assert!(eval.dist_std > 0.0);
        assert!((eval.dist_mean - distance).abs() < 4.0 * eval.dist_std + 50.0);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let triggers = injected_triggers(2.0, 0.1, 200.0);
        let params = BayestarParams::builder().build().unwrap();
        let like = NetworkLikelihood::new(&triggers, &params);
        let a = like.evaluate(0.5, 0.5);
        let b = like.evaluate(0.5, 0.5);
        assert_eq!(a.ln_post, b.ln_post);
        assert_eq!(a.dist_mean, b.dist_mean);
    }
}

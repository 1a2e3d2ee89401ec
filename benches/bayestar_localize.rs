use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skyloc::bayestar::DetectorTrigger;
use skyloc::signal_model::{detector_response, predicted_snr};
use skyloc::{localize, BayestarParams, Detector};

/// Hanford/Livingston/Virgo geometry with a noise-free injection.
fn prepare_triggers() -> Vec<DetectorTrigger> {
    let sites = [
        Detector::interferometer(
            "H1",
            [-2.16141492636e6, -3.83469517889e6, 4.60035022664e6],
            [-0.22389266154, 0.79983062746, 0.55690487831],
            [-0.91397818574, 0.02609403989, -0.40492342125],
        )
        .unwrap(),
        Detector::interferometer(
            "L1",
            [-7.42760447238e4, -5.49628371971e6, 3.22425701744e6],
            [-0.95457412153, -0.14158077340, -0.26218911324],
            [0.29774156894, -0.48791033647, -0.82054461286],
        )
        .unwrap(),
        Detector::interferometer(
            "V1",
            [4.54637409900e6, 8.42989697626e5, 4.37857696241e6],
            [-0.70045821479, 0.20848948619, 0.68256166277],
            [-0.05379255368, -0.96908180549, 0.24080451708],
        )
        .unwrap(),
    ];

    let (ra, dec, t0) = (3.446, -0.408, 1187008882.43);
    sites
        .into_iter()
        .map(|det| {
            let resp = detector_response(&det, ra, dec, 0.6, t0);
            let snr = predicted_snr(resp.fplus, resp.fcross, 0.85, 40.0, 1200.0);
            DetectorTrigger {
                detector: Arc::new(det),
                arrival_time: t0 + resp.time_delay,
                time_sigma: 1.0e-3,
                snr,
                amplitude_1mpc: 1200.0,
            }
        })
        .collect()
}

fn bench_localize(c: &mut Criterion) {
    let triggers = prepare_triggers();
    let params = BayestarParams::builder()
        .base_order(3)
        .max_order(5)
        .build()
        .unwrap();

    c.bench_function("bayestar_localize_3det", |b| {
        b.iter(|| localize(black_box(&triggers), black_box(&params)).unwrap())
    });
}

criterion_group!(bayestar_benches, bench_localize);
criterion_main!(bayestar_benches);

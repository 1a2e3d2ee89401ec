use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use skyloc::{kde_sky_map, KdeParams, SkySample};

fn prepare_samples(n: usize) -> Vec<SkySample> {
    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(0.0, 0.04).unwrap();
    (0..n)
        .map(|_| {
            SkySample::new(
                2.0 + normal.sample(&mut rng),
                0.3 + normal.sample(&mut rng),
            )
        })
        .collect()
}

fn bench_kde(c: &mut Criterion) {
    let samples = prepare_samples(500);
    let params = KdeParams::builder()
        .base_order(4)
        .max_order(6)
        .build()
        .unwrap();

    c.bench_function("kde_sky_map_500_samples", |b| {
        b.iter(|| kde_sky_map(black_box(&samples), black_box(&params)).unwrap())
    });
}

criterion_group!(kde_benches, bench_kde);
criterion_main!(kde_benches);

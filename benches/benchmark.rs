use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dem_align::config::RansacConfig;
use dem_align::dedup::dedup;
use dem_align::detected_points::{CorrespondenceSet, InterestPoint};
use dem_align::ransac::estimate;
use nalgebra as na;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn bench_dedup(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut set = CorrespondenceSet::default();
    for _ in 0..500 {
        set.push(
            InterestPoint::at(rng.random_range(0..200) as f64, rng.random_range(0..200) as f64),
            InterestPoint::at(rng.random_range(0..200) as f64, rng.random_range(0..200) as f64),
        );
    }

    c.bench_function("dedup_500", |b| b.iter(|| dedup(black_box(&set))));
}

fn bench_ransac(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let m = na::Matrix2::new(1.001, -0.002, 0.002, 0.999);
    let t = na::Vector2::new(0.01, -0.02);
    let mut a = Vec::new();
    let mut b = Vec::new();
    for i in 0..200 {
        let p = na::Vector2::new(rng.random_range(-122.2..-122.0), rng.random_range(37.0..37.2));
        let q = if i % 4 == 0 {
            na::Vector2::new(rng.random_range(-122.2..-122.0), rng.random_range(37.0..37.2))
        } else {
            m * p + t
        };
        a.push(na::Vector3::new(p.x, p.y, 1.0));
        b.push(na::Vector3::new(q.x, q.y, 1.0));
    }
    let config = RansacConfig::default();

    c.bench_function("ransac_affine_200", |bench| {
        bench.iter(|| {
            let mut sampler = ChaCha8Rng::seed_from_u64(2);
            estimate(black_box(&a), black_box(&b), &config, &mut sampler)
        })
    });
}

criterion_group!(benches, bench_dedup, bench_ransac);
criterion_main!(benches);

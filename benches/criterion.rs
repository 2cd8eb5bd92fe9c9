use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use sift_match::{compute_distance_matrix, find_best_matches, MatchOptions};

fn random_descriptors(rng: &mut Pcg64, num: usize) -> Array2<u8> {
    Array2::from_shape_fn((num, 128), |_| rng.gen_range(0..64))
}

fn match_random(c: &mut Criterion) {
    let _ = pretty_env_logger::try_init();
    let mut rng = Pcg64::seed_from_u64(0);
    let descriptors1 = random_descriptors(&mut rng, 2048);
    let descriptors2 = random_descriptors(&mut rng, 2048);
    let options = MatchOptions::default();

    c.bench_function("distance matrix 2048", |b| {
        b.iter(|| compute_distance_matrix(descriptors1.view(), descriptors2.view()))
    });

    let dists = compute_distance_matrix(descriptors1.view(), descriptors2.view())
        .expect("descriptors have the same width");
    c.bench_function("cross checked matches 2048", |b| {
        b.iter(|| find_best_matches(dists.view(), &options))
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = match_random
);
criterion_main!(benches);

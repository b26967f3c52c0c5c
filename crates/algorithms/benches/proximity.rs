//! Benchmarks for the distance transform and the per-layer chain

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use proxima_algorithms::distance::euclidean_distance;
use proxima_algorithms::influence::exponential_decay;
use proxima_algorithms::overlay::WeightedOverlay;

fn create_mask(size: usize) -> Array2<bool> {
    // Sparse, irregular features
    Array2::from_shape_fn((size, size), |(row, col)| (row * 7 + col * 13) % 211 == 0)
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("euclidean_distance");

    for size in [256, 512, 1024, 2048].iter() {
        let mask = create_mask(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| euclidean_distance(black_box(mask.view())).unwrap())
        });
    }

    group.finish();
}

fn bench_layer_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_to_composite");

    for size in [256, 1024].iter() {
        let mask = create_mask(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut overlay = WeightedOverlay::new();
                for (decay, weight) in [(0.01, 0.6), (0.1, 0.4)] {
                    let field = euclidean_distance(black_box(mask.view())).unwrap();
                    let score = exponential_decay(&field, decay).unwrap();
                    overlay.add(&score, weight).unwrap();
                }
                overlay.finish().unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distance, bench_layer_chain);
criterion_main!(benches);

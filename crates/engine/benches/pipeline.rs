//! Benchmark of a full analysis request against in-memory sources

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array3;
use proxima_cloud::{Catalog, CloudError, RasterFetcher, SourceRef};
use proxima_core::{GeoTransform, RasterDataset, SampleType, CRS};
use proxima_engine::{EngineOptions, LayerParameters, LayerRegistry, LayerSelection, ProximityEngine};

struct InMemory {
    size: usize,
}

impl RasterFetcher for InMemory {
    fn fetch(&self, source: &SourceRef) -> proxima_cloud::Result<RasterDataset> {
        let stride = source.to_string().len() + 97;
        let bands = Array3::from_shape_fn((1, self.size, self.size), |(_, row, col)| {
            if (row * 7 + col * 13) % stride == 0 {
                1.0
            } else {
                0.0
            }
        });
        RasterDataset::new(
            bands,
            SampleType::U8,
            Some(GeoTransform::new(0.0, 0.0, 1.0, -1.0)),
            Some(CRS::wgs84()),
            None,
        )
        .map_err(CloudError::from)
    }
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("proximity_request");
    group.sample_size(10);

    let catalog = Catalog::from_entries([
        ("deposits.tif", "https://host/deposits.tif"),
        ("permits.tif", "https://host/permits.tif"),
        ("roads.tif", "https://host/roads.tif"),
    ]);
    let registry = LayerRegistry::from_catalog(&catalog);
    let selections = [
        LayerSelection::new("deposits.tif", LayerParameters::new(0.01, 0.5)),
        LayerSelection::new("permits.tif", LayerParameters::new(0.05, 0.3)),
        LayerSelection::new("roads.tif", LayerParameters::new(0.1, 0.2)),
    ];

    for size in [256, 1024].iter() {
        let engine = ProximityEngine::new(InMemory { size: *size }, EngineOptions::default());

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| engine.run(&registry, black_box(&selections)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run);
criterion_main!(benches);

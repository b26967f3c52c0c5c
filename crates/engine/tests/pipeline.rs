//! End-to-end tests of the proximity analysis request.

use std::cell::Cell;
use std::collections::HashMap;

use approx::assert_relative_eq;
use ndarray::{Array2, Array3, Axis};
use proxima_cloud::blocking::BlockingFetcher;
use proxima_cloud::{Catalog, CloudError, FetchOptions, RasterFetcher, SourceRef};
use proxima_colormap::palette_for;
use proxima_core::io::{write_geotiff, Compression, GeoTiffOptions};
use proxima_core::{GeoTransform, Raster, RasterDataset, SampleType, CRS};
use proxima_engine::{
    EngineOptions, LayerParameters, LayerRegistry, LayerSelection, PipelineError, ProximityEngine,
};

/// Serves datasets from memory and counts calls.
#[derive(Default)]
struct MemoryFetcher {
    datasets: HashMap<String, RasterDataset>,
    calls: Cell<usize>,
}

impl MemoryFetcher {
    fn with(mut self, location: &str, dataset: RasterDataset) -> Self {
        self.datasets.insert(location.to_string(), dataset);
        self
    }
}

impl RasterFetcher for MemoryFetcher {
    fn fetch(&self, source: &SourceRef) -> proxima_cloud::Result<RasterDataset> {
        self.calls.set(self.calls.get() + 1);
        self.datasets
            .get(&source.to_string())
            .cloned()
            .ok_or_else(|| CloudError::Network(format!("no such source {}", source)))
    }
}

fn transform() -> GeoTransform {
    GeoTransform::new(-1.5, 47.0, 0.001, -0.001)
}

fn dataset(mask: &Array2<f64>, crs: Option<CRS>) -> RasterDataset {
    let bands = mask.clone().insert_axis(Axis(0));
    RasterDataset::new(bands, SampleType::F32, Some(transform()), crs, None).unwrap()
}

fn point_mask(rows: usize, cols: usize, points: &[(usize, usize)]) -> Array2<f64> {
    let mut mask = Array2::zeros((rows, cols));
    for &(r, c) in points {
        mask[(r, c)] = 1.0;
    }
    mask
}

fn catalog(names: &[&str]) -> Catalog {
    Catalog::from_entries(names.iter().map(|n| (n.to_string(), format!("https://host/{}", n))))
}

fn url(name: &str) -> String {
    format!("https://host/{}", name)
}

fn sel(name: &str, decay: f64, weight: f64) -> LayerSelection {
    LayerSelection::new(name, LayerParameters::new(decay, weight))
}

fn composite(output: &proxima_engine::ProximityOutput) -> Array2<f64> {
    output.output.decode().unwrap().band_view(0).unwrap().to_owned()
}

#[test]
fn featureless_layer_gives_all_zero_composite() {
    let fetcher = MemoryFetcher::default().with(
        &url("empty.tif"),
        dataset(&Array2::zeros((4, 4)), Some(CRS::wgs84())),
    );
    let registry = LayerRegistry::from_catalog(&catalog(&["empty.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let result = engine.run(&registry, &[sel("empty.tif", 0.01, 1.0)]).unwrap();

    assert!(result.stats.degenerate);
    assert_eq!(result.stats.layers[0].feature_cells, 0);
    let out = composite(&result);
    assert_eq!(out.dim(), (4, 4));
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn single_layer_is_normalized_to_unit_range() {
    let fetcher = MemoryFetcher::default().with(
        &url("permits.tif"),
        dataset(&point_mask(4, 4, &[(0, 0)]), Some(CRS::wgs84())),
    );
    let registry = LayerRegistry::from_catalog(&catalog(&["permits.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let result = engine.run(&registry, &[sel("permits.tif", 0.5, 1.0)]).unwrap();
    let out = composite(&result);

    assert!(!result.stats.degenerate);
    assert_relative_eq!(out[(0, 0)], 1.0, epsilon = 1e-6);
    assert_relative_eq!(out[(3, 3)], 0.0, epsilon = 1e-6);
    assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert_relative_eq!(result.stats.raw_max, 1.0, epsilon = 1e-12);
    assert_relative_eq!(result.stats.raw_min, (-0.5 * 18f64.sqrt()).exp(), epsilon = 1e-12);
    // Monotone in distance along the first row
    assert!(out[(0, 1)] > out[(0, 2)] && out[(0, 2)] > out[(0, 3)]);
}

#[test]
fn equal_halves_match_single_layer() {
    let mask = point_mask(6, 7, &[(1, 2), (4, 5)]);
    let names = ["a.tif", "b.tif"];
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&mask, Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&mask, Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&names));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let pair = engine
        .run(&registry, &[sel("a.tif", 0.2, 0.5), sel("b.tif", 0.2, 0.5)])
        .unwrap();
    let single = engine.run(&registry, &[sel("a.tif", 0.2, 1.0)]).unwrap();

    let (pair, single) = (composite(&pair), composite(&single));
    for (p, s) in pair.iter().zip(single.iter()) {
        assert_relative_eq!(*p, *s, epsilon = 1e-6);
    }
}

#[test]
fn selection_order_does_not_matter() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(5, 5, &[(0, 0)]), Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&point_mask(5, 5, &[(4, 2)]), Some(CRS::wgs84())))
        .with(&url("c.tif"), dataset(&point_mask(5, 5, &[(2, 4)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif", "c.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let forward = [sel("a.tif", 0.1, 0.2), sel("b.tif", 0.3, 0.5), sel("c.tif", 0.05, 0.9)];
    let mut backward = forward.clone();
    backward.reverse();

    let x = engine.run(&registry, &forward).unwrap();
    let y = engine.run(&registry, &backward).unwrap();
    assert_eq!(x.output.as_bytes(), y.output.as_bytes());
    assert_eq!(x.display, y.display);
}

#[test]
fn invalid_decay_fails_before_any_fetch() {
    let fetcher = MemoryFetcher::default().with(
        &url("permits.tif"),
        dataset(&point_mask(4, 4, &[(0, 0)]), Some(CRS::wgs84())),
    );
    let registry = LayerRegistry::from_catalog(&catalog(&["permits.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    for decay in [0.0, -0.3, f64::NAN] {
        let err = engine.run(&registry, &[sel("permits.tif", decay, 1.0)]).unwrap_err();
        match err {
            PipelineError::Parameter { layer, parameter, .. } => {
                assert_eq!(layer, "permits.tif");
                assert_eq!(parameter, "decay");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    let err = engine.run(&registry, &[sel("permits.tif", 0.1, 1.5)]).unwrap_err();
    assert!(matches!(err, PipelineError::Parameter { parameter: "weight", .. }));

    assert_eq!(engine.fetcher().calls.get(), 0);
}

#[test]
fn shape_mismatch_names_both_layers() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&Array2::zeros((4, 4)), Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&Array2::zeros((3, 5)), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let err = engine
        .run(&registry, &[sel("b.tif", 0.1, 1.0), sel("a.tif", 0.1, 1.0)])
        .unwrap_err();
    match &err {
        PipelineError::ShapeMismatch {
            layer,
            reference,
            expected,
            actual,
        } => {
            assert_eq!(layer, "b.tif");
            assert_eq!(reference, "a.tif");
            assert_eq!(*expected, (4, 4));
            assert_eq!(*actual, (3, 5));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().contains("share one pixel grid"));
}

#[test]
fn shape_mismatch_is_raised_before_any_layer_is_folded() {
    // Reference carries features, so folding it first would have succeeded
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(4, 4, &[(1, 1)]), Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&point_mask(3, 5, &[(0, 0)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());
    let selections = [sel("a.tif", 0.1, 0.5), sel("b.tif", 0.1, 0.5)];

    // Folding only happens in compute, which needs a prepared request
    let err = engine.prepare(&registry, &selections).unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    assert_eq!(engine.fetcher().calls.get(), 2);

    let err = engine.run(&registry, &selections).unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
}

#[test]
fn prepared_request_computes_like_run() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(5, 5, &[(0, 0)]), Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&point_mask(5, 5, &[(4, 4)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());
    let selections = [sel("b.tif", 0.2, 0.4), sel("a.tif", 0.1, 0.6)];

    let request = engine.prepare(&registry, &selections).unwrap();
    assert_eq!(request.layer_names().collect::<Vec<_>>(), ["a.tif", "b.tif"]);
    assert_eq!(request.shape(), Some((5, 5)));

    let staged = engine.compute(request).unwrap();
    let direct = engine.run(&registry, &selections).unwrap();
    assert_eq!(staged.stats, direct.stats);
    assert_eq!(composite(&staged), composite(&direct));
}

#[test]
fn request_level_errors() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(3, 3, &[(1, 1)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "final_df.csv", "gone.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    assert!(matches!(engine.run(&registry, &[]), Err(PipelineError::EmptySelection)));
    assert!(matches!(
        engine.run(&registry, &[sel("nope.tif", 0.1, 1.0)]),
        Err(PipelineError::UnknownLayer { .. })
    ));
    assert!(matches!(
        engine.run(&registry, &[sel("final_df.csv", 0.1, 1.0)]),
        Err(PipelineError::NotARaster { .. })
    ));
    assert!(matches!(
        engine.run(&registry, &[sel("a.tif", 0.1, 0.5), sel("a.tif", 0.2, 0.5)]),
        Err(PipelineError::Parameter { parameter: "selection", .. })
    ));

    let err = engine
        .run(&registry, &[sel("a.tif", 0.1, 1.0), sel("gone.tif", 0.1, 1.0)])
        .unwrap_err();
    assert_eq!(err.layer(), Some("gone.tif"));
    assert!(matches!(err, PipelineError::Retrieval { .. }));
}

#[test]
fn reference_without_crs_is_rejected() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(3, 3, &[(1, 1)]), None))
        .with(&url("b.tif"), dataset(&point_mask(3, 3, &[(0, 0)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let err = engine
        .run(&registry, &[sel("b.tif", 0.1, 1.0), sel("a.tif", 0.1, 1.0)])
        .unwrap_err();
    match err {
        PipelineError::Georeferencing { layer, .. } => assert_eq!(layer, "a.tif"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn display_handoff_palettes() {
    let fetcher = MemoryFetcher::default()
        .with(&url("a.tif"), dataset(&point_mask(3, 3, &[(1, 1)]), Some(CRS::wgs84())))
        .with(&url("b.tif"), dataset(&point_mask(3, 3, &[(0, 0)]), Some(CRS::wgs84())));
    let registry = LayerRegistry::from_catalog(&catalog(&["a.tif", "b.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let single = engine.run(&registry, &[sel("a.tif", 0.1, 1.0)]).unwrap();
    assert_eq!(single.display.palette, registry.get("a.tif").unwrap().palette());
    assert_eq!(single.display.nodata, Some(-9999.0));

    let both = engine
        .run(&registry, &[sel("a.tif", 0.1, 1.0), sel("b.tif", 0.1, 1.0)])
        .unwrap();
    assert_eq!(both.display.name, "proximity(a.tif, b.tif)");
    assert_eq!(both.display.palette, palette_for("proximity(a.tif, b.tif)"));
}

#[test]
fn files_on_disk_round_trip_georeferencing() {
    let dir = tempfile::tempdir().unwrap();
    let crs = CRS::from_epsg(2154);
    let gt = GeoTransform::new(650_000.0, 6_860_000.0, 25.0, -25.0);

    let mut entries = Vec::new();
    for (name, point) in [("deposits.tif", (2, 3)), ("permits.tif", (10, 12))] {
        let mut raster: Raster<f32> = Raster::filled(20, 30, 0.0);
        raster.set(point.0, point.1, 1.0).unwrap();
        raster.set_transform(Some(gt));
        raster.set_crs(Some(crs.clone()));
        let path = dir.path().join(name);
        write_geotiff(&raster, &path, None).unwrap();
        entries.push((name.to_string(), SourceRef::Path(path)));
    }
    let registry = LayerRegistry::from_catalog(&Catalog::from_entries(entries));

    let options = EngineOptions {
        geotiff: GeoTiffOptions {
            compression: Compression::Lzw,
            tile_size: 16,
            nodata: Some(-9999.0),
        },
        output_name: Some("proximity".to_string()),
    };
    let engine = ProximityEngine::new(BlockingFetcher::new(FetchOptions::default()).unwrap(), options);
    let result = engine
        .run(&registry, &[sel("permits.tif", 0.05, 0.7), sel("deposits.tif", 0.1, 0.3)])
        .unwrap();

    let out_path = dir.path().join("proximity.tif");
    result.output.write_to(&out_path).unwrap();
    let decoded = proxima_core::io::read_dataset(&out_path).unwrap();

    assert_eq!(decoded.shape(), (20, 30));
    assert_eq!(decoded.band_count(), 1);
    assert_eq!(decoded.dtype(), SampleType::F32);
    assert_eq!(decoded.transform(), Some(&gt));
    assert!(decoded.crs().unwrap().is_equivalent(&crs));
    assert_eq!(decoded.nodata(), Some(-9999.0));
    assert_eq!(result.output.compression(), Compression::Lzw);
    assert_eq!(result.display.name, "proximity");

    let band = decoded.band_view(0).unwrap();
    let max = band.iter().cloned().fold(f64::MIN, f64::max);
    let min = band.iter().cloned().fold(f64::MAX, f64::min);
    assert_relative_eq!(max, 1.0, epsilon = 1e-6);
    assert_relative_eq!(min, 0.0, epsilon = 1e-6);
    assert_eq!(result.stats.layers[0].name, "deposits.tif");
    assert_eq!(result.stats.layers[1].feature_cells, 1);
}

#[test]
fn unreadable_files_map_to_retrieval_and_decode() {
    let dir = tempfile::tempdir().unwrap();
    let junk = dir.path().join("junk.tif");
    std::fs::write(&junk, b"definitely not a tiff").unwrap();
    let registry = LayerRegistry::from_catalog(&Catalog::from_entries([
        ("junk.tif".to_string(), SourceRef::Path(junk)),
        ("missing.tif".to_string(), SourceRef::Path(dir.path().join("missing.tif"))),
    ]));
    let engine = ProximityEngine::new(
        BlockingFetcher::new(FetchOptions::default()).unwrap(),
        EngineOptions::default(),
    );

    let err = engine.run(&registry, &[sel("junk.tif", 0.1, 1.0)]).unwrap_err();
    assert!(matches!(err, PipelineError::Decode { ref layer, .. } if layer == "junk.tif"));

    let err = engine.run(&registry, &[sel("missing.tif", 0.1, 1.0)]).unwrap_err();
    assert!(matches!(err, PipelineError::Retrieval { ref layer, .. } if layer == "missing.tif"));
    assert!(err.to_string().contains("missing.tif"));
}

#[test]
fn multiband_sources_use_the_first_band() {
    let mut bands = Array3::zeros((2, 4, 4));
    bands[(0, 0, 0)] = 1.0;
    bands[(1, 3, 3)] = 1.0;
    let ds = RasterDataset::new(bands, SampleType::U8, Some(transform()), Some(CRS::wgs84()), None).unwrap();
    let fetcher = MemoryFetcher::default().with(&url("rgb.tif"), ds);
    let registry = LayerRegistry::from_catalog(&catalog(&["rgb.tif"]));
    let engine = ProximityEngine::new(fetcher, EngineOptions::default());

    let out = composite(&engine.run(&registry, &[sel("rgb.tif", 0.5, 1.0)]).unwrap());
    assert_relative_eq!(out[(0, 0)], 1.0, epsilon = 1e-6);
    assert_relative_eq!(out[(3, 3)], 0.0, epsilon = 1e-6);
}

//! Proximity analysis pipeline.
//!
//! One call to [`ProximityEngine::run`] is [`ProximityEngine::prepare`]
//! (validate the request, fetch every selected source, check that they share
//! a pixel grid) followed by [`ProximityEngine::compute`] (per layer build a
//! feature mask, run the distance transform, apply the decay and fold the
//! result into a weighted overlay). The normalized composite is
//! encoded against the first layer in name order.
//!
//! Nothing is shared between runs; each owns the datasets it opened.

use std::collections::BTreeMap;
use std::time::Instant;

use proxima_algorithms::distance::{euclidean_distance, feature_mask};
use proxima_algorithms::influence::exponential_decay;
use proxima_algorithms::overlay::WeightedOverlay;
use proxima_cloud::{RasterFetcher, SourceRef};
use proxima_colormap::{palette_for, Palette};
use proxima_core::io::{encode_output, GeoTiffOptions, OutputRaster};
use proxima_core::RasterDataset;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::params::{LayerParameters, LayerSelection};
use crate::registry::{LayerRegistry, RasterLayer};

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Encoding of the output raster
    pub geotiff: GeoTiffOptions,
    /// Name for the output layer; derived from the selected layers when unset
    pub output_name: Option<String>,
}

/// What the map display needs to render the output
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayHandoff {
    /// Output layer name
    pub name: String,
    /// Nodata sentinel recorded in the output
    pub nodata: Option<f64>,
    /// Palette identifier
    pub palette: Palette,
}

/// Per-layer figures from one run
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub name: String,
    pub params: LayerParameters,
    pub feature_cells: usize,
}

/// Composite figures from one run
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeStats {
    /// Layers in fold order
    pub layers: Vec<LayerSummary>,
    /// Weighted sum range before normalization
    pub raw_min: f64,
    pub raw_max: f64,
    /// True when the weighted sum was constant and the output is all-zero
    pub degenerate: bool,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ProximityOutput {
    pub output: OutputRaster,
    pub display: DisplayHandoff,
    pub stats: CompositeStats,
}

/// Proximity analysis engine.
///
/// Generic over the fetcher so sources can come from the network, local
/// files, or memory.
pub struct ProximityEngine<F: RasterFetcher> {
    fetcher: F,
    options: EngineOptions,
}

/// A selection resolved against the registry
struct Resolved<'a> {
    layer: &'a RasterLayer,
    params: LayerParameters,
}

/// A request whose sources are fetched and share one pixel grid.
///
/// Only [`ProximityEngine::prepare`] builds one, so no distance transform
/// runs before every layer has been fetched and checked.
#[derive(Debug)]
pub struct PreparedRequest {
    /// Fetched layers in name order; the first is the reference
    layers: Vec<PreparedLayer>,
    /// Palette of the layer when exactly one is selected
    single_palette: Option<Palette>,
    started: Instant,
}

#[derive(Debug)]
struct PreparedLayer {
    name: String,
    dataset: RasterDataset,
    params: LayerParameters,
}

impl PreparedRequest {
    /// Layer names in fold order
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Shared (rows, cols) of every layer
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.layers.first().map(|l| l.dataset.shape())
    }
}

impl<F: RasterFetcher> ProximityEngine<F> {
    pub fn new(fetcher: F, options: EngineOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run one analysis request.
    ///
    /// The selection order does not affect the result. Any failure aborts
    /// the whole request; no partial composite is returned.
    pub fn run(&self, registry: &LayerRegistry, selections: &[LayerSelection]) -> Result<ProximityOutput> {
        let request = self.prepare(registry, selections)?;
        self.compute(request)
    }

    /// Resolve, validate and fetch every selection, then check the grids.
    pub fn prepare(&self, registry: &LayerRegistry, selections: &[LayerSelection]) -> Result<PreparedRequest> {
        let started = Instant::now();

        let resolved = resolve_selections(registry, selections)?;
        let names: Vec<&str> = resolved.keys().map(String::as_str).collect();
        info!("Proximity analysis over {} layer(s): {}", names.len(), names.join(", "));

        let sources: Vec<SourceRef> = resolved.values().map(|r| r.layer.source().clone()).collect();
        let mut layers = Vec::with_capacity(sources.len());
        for ((name, r), fetched) in resolved.iter().zip(self.fetcher.fetch_all(&sources)) {
            let dataset = fetched.map_err(|e| {
                PipelineError::from_fetch(name, &r.layer.source().to_string(), e)
            })?;
            layers.push(PreparedLayer {
                name: name.clone(),
                dataset,
                params: r.params,
            });
        }
        debug!("Fetched {} source(s) in {:.2?}", layers.len(), started.elapsed());

        check_grids(&layers)?;

        let single_palette = match resolved.values().next() {
            Some(r) if resolved.len() == 1 => Some(r.layer.palette()),
            _ => None,
        };
        Ok(PreparedRequest {
            layers,
            single_palette,
            started,
        })
    }

    /// Fold every layer of a prepared request and encode the composite.
    pub fn compute(&self, request: PreparedRequest) -> Result<ProximityOutput> {
        let PreparedRequest {
            layers,
            single_palette,
            started,
        } = request;
        let names: Vec<String> = layers.iter().map(|l| l.name.clone()).collect();

        // Reference stays alive for encoding; the rest drop once folded
        let mut layers = layers.into_iter();
        let Some(reference) = layers.next() else {
            return Err(PipelineError::EmptySelection);
        };

        let mut overlay = WeightedOverlay::new();
        let mut summaries = Vec::with_capacity(names.len());
        summaries.push(fold_layer(&mut overlay, &reference)?);
        for layer in layers {
            summaries.push(fold_layer(&mut overlay, &layer)?);
        }

        let composite = overlay
            .finish()
            .map_err(|e| PipelineError::from_core(&reference.name, e))?;
        if composite.degenerate {
            warn!(
                "Composite of {} is constant; returning an all-zero surface",
                names.join(", ")
            );
        }

        let output = encode_output(&composite.raster, &reference.dataset, &self.options.geotiff)
            .map_err(|e| PipelineError::from_core(&reference.name, e))?;

        let handoff = self.display_handoff(&names, single_palette);
        info!(
            "Composite {}x{} encoded as {} ({} bytes) in {:.2?}",
            output.width(),
            output.height(),
            handoff.name,
            output.as_bytes().len(),
            started.elapsed()
        );

        Ok(ProximityOutput {
            output,
            display: handoff,
            stats: CompositeStats {
                layers: summaries,
                raw_min: composite.raw_min,
                raw_max: composite.raw_max,
                degenerate: composite.degenerate,
            },
        })
    }

    fn display_handoff(&self, names: &[String], single_palette: Option<Palette>) -> DisplayHandoff {
        let name = self
            .options
            .output_name
            .clone()
            .unwrap_or_else(|| format!("proximity({})", names.join(", ")));
        let palette = single_palette.unwrap_or_else(|| palette_for(&name));
        DisplayHandoff {
            name,
            nodata: self.options.geotiff.nodata,
            palette,
        }
    }
}

/// Resolve names and validate parameters, before any I/O.
fn resolve_selections<'a>(
    registry: &'a LayerRegistry,
    selections: &[LayerSelection],
) -> Result<BTreeMap<String, Resolved<'a>>> {
    if selections.is_empty() {
        return Err(PipelineError::EmptySelection);
    }

    let mut resolved = BTreeMap::new();
    for selection in selections {
        let layer = registry.resolve(&selection.name)?;
        selection.params.validate(&selection.name)?;
        if resolved.contains_key(&selection.name) {
            return Err(PipelineError::Parameter {
                layer: selection.name.clone(),
                parameter: "selection",
                value: selection.to_string(),
                reason: "layer selected more than once".into(),
            });
        }
        resolved.insert(
            selection.name.clone(),
            Resolved {
                layer,
                params: selection.params,
            },
        );
    }
    Ok(resolved)
}

/// All layers must share the reference's pixel grid, and the reference must
/// be georeferenced.
fn check_grids(layers: &[PreparedLayer]) -> Result<()> {
    let Some((reference, others)) = layers.split_first() else {
        return Err(PipelineError::EmptySelection);
    };
    let reference_name = reference.name.as_str();
    let expected = reference.dataset.shape();

    for other in others {
        if other.dataset.shape() != expected {
            return Err(PipelineError::ShapeMismatch {
                layer: other.name.clone(),
                reference: reference.name.clone(),
                expected,
                actual: other.dataset.shape(),
            });
        }
    }

    let (transform, crs) = reference
        .dataset
        .georeference()
        .map_err(|e| PipelineError::from_core(reference_name, e))?;

    for PreparedLayer { name, dataset, .. } in others {
        match dataset.crs() {
            Some(other) if !other.is_equivalent(crs) => warn!(
                "Layer {} is in {} but {} is in {}; no reprojection is done",
                name,
                other.identifier(),
                reference_name,
                crs.identifier()
            ),
            _ => {}
        }
        if let Some(other) = dataset.transform() {
            if other != transform {
                warn!(
                    "Layer {} has a different geotransform than {}; pixels are combined by index",
                    name, reference_name
                );
            }
        }
    }
    Ok(())
}

/// Mask, distance, decay, and fold one layer. Intermediates drop on return.
fn fold_layer(overlay: &mut WeightedOverlay, layer: &PreparedLayer) -> Result<LayerSummary> {
    let PreparedLayer {
        name,
        dataset,
        params,
    } = layer;
    let params = *params;
    let band = dataset
        .band(0)
        .map_err(|e| PipelineError::from_core(name, e))?;
    let mask = feature_mask(&band);
    drop(band);

    let field = euclidean_distance(mask.view()).map_err(|e| PipelineError::from_core(name, e))?;
    if !field.has_features() {
        warn!("Layer {} has no feature cells; its influence is zero", name);
    }
    let score = exponential_decay(&field, params.decay).map_err(|e| PipelineError::from_core(name, e))?;
    overlay
        .add(&score, params.weight)
        .map_err(|e| PipelineError::from_core(name, e))?;

    debug!(
        "Folded {} (k={}, w={}, {} feature cell(s))",
        name,
        params.decay,
        params.weight,
        field.feature_count()
    );

    Ok(LayerSummary {
        name: name.clone(),
        params,
        feature_cells: field.feature_count(),
    })
}
